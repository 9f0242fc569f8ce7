pub mod artifact_output_adapter;
pub mod json_table_adapter;
