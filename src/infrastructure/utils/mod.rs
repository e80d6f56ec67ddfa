pub mod bracket_fields;
pub mod multipart_form;
pub mod valid_uuid;
