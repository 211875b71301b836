/// External collaborators
///
/// Each collaborator is a trait so handlers can be exercised against
/// in-process doubles:
///
/// - [`mailer::Mailer`]: transactional mail (welcome, password reset)
/// - [`payments::PaymentProvider`]: hosted checkout preferences

pub mod mailer;
pub mod payments;
