//! Command implementations for auditing security event logs.
//!
//! - [`auth_audit`] - Kerberos and NTLM authentication activity per account
//! - [`lifecycle_audit`] - Account creation, enabling, disabling and deletion
//!
//! Both share option validation, source selection and the per-source report
//! in [`audit_run`].

pub mod audit_run;
pub mod auth_audit;
pub mod lifecycle_audit;
