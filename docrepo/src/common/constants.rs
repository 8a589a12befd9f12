// document field constants
pub const DOC_ID: &str = "_id";
pub const DOC_CREATED_AT: &str = "created_at";
pub const DOC_UPDATED_AT: &str = "updated_at";

// update operator constants
pub const SET_OPERATOR: &str = "$set";
pub const INC_OPERATOR: &str = "$inc";

// index option constants
pub const INDEX_NAME_SEPARATOR: &str = "_";
