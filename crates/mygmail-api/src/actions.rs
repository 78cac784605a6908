//! Draft and send calls that report API failures instead of returning them.

use crate::error::{Error, Result};
use crate::service::GmailApi;
use crate::types::{Draft, MessageRef, RawMessage};
use tracing::{error, info};

/// Logs a failed request and turns it into `Ok(None)`; any other error is
/// passed through.
fn report<T>(result: Result<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e @ (Error::Api { .. } | Error::Http(_))) => {
            error!("An error occurred: {e}");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Creates a draft and logs its id and message.
///
/// # Errors
///
/// API and transport failures are logged and yield `Ok(None)`; credential
/// and decoding errors are returned.
pub async fn create_draft(
    service: &impl GmailApi,
    user_id: &str,
    message: &RawMessage,
) -> Result<Option<Draft>> {
    let draft = report(service.create_draft(user_id, message).await)?;
    if let Some(draft) = &draft {
        info!("Draft id: {}", draft.id);
        info!("Draft message: {}", draft.message);
    }
    Ok(draft)
}

/// Sends a message and logs the id Gmail assigned.
///
/// # Errors
///
/// API and transport failures are logged and yield `Ok(None)`; credential
/// and decoding errors are returned.
pub async fn send_message(
    service: &impl GmailApi,
    user_id: &str,
    message: &RawMessage,
) -> Result<Option<MessageRef>> {
    let sent = report(service.send_message(user_id, message).await)?;
    if let Some(sent) = &sent {
        info!("Message Id: {}", sent.id);
    }
    Ok(sent)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_keeps_success() {
        assert_eq!(report(Ok(3)).ok(), Some(Some(3)));
    }

    #[test]
    fn test_report_swallows_api_errors() {
        let result: Result<u8> = Err(Error::Api {
            status: 403,
            message: "Insufficient Permission".to_string(),
        });
        assert!(matches!(report(result), Ok(None)));
    }

    #[test]
    fn test_report_passes_credential_errors() {
        let result: Result<u8> = Err(Error::Auth(mygmail_oauth::Error::NoRefreshToken));
        assert!(matches!(
            report(result),
            Err(Error::Auth(mygmail_oauth::Error::NoRefreshToken))
        ));
    }

    #[test]
    fn test_report_passes_decoding_errors() {
        let json = serde_json::from_str::<u8>("x").map_err(Error::from);
        assert!(matches!(report(json), Err(Error::Json(_))));
    }
}
