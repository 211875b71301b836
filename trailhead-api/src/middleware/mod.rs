/// Middleware for the API server
///
/// - [`auth`]: session gates (`protect`, `protect_page`, `is_logged_in`) and
///   role checks (`restrict_to`)
/// - [`errors`]: surfaces internal error detail in development

pub mod auth;
pub mod errors;
