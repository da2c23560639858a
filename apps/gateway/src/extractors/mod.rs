pub mod bearer;
pub mod caller;
pub mod validated_json;
pub mod validated_query;

pub use bearer::BearerToken;
pub use caller::Caller;
pub use validated_json::ValidatedJson;
pub use validated_query::ValidatedQuery;
