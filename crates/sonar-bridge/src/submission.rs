//! Signup submission pipeline
//!
//! Turns a completed form submission into a Sonar serviceable address and
//! account: two dependent remote writes, where the address id returned by the
//! first is a required input of the second. Any failure halts the run, is
//! logged, and is emailed to the operator address configured on the form.
//! Nothing is surfaced to the end user (their confirmation has already been
//! rendered by the time this runs), nothing is retried, and a created address
//! is not rolled back when account creation fails. Re-delivery of the same
//! submission creates duplicate CRM entities; there is no dedup guard.

use async_trait::async_trait;
use serde::Serialize;
use sonar_api::{
    CreateAccountInput, CustomFieldValue, PhoneNumberInput, PrimaryContactInput,
    ServiceableAddressInput, SonarClient,
};
use tracing::{error, info};

use crate::error::{BridgeError, Result};
use crate::extract::extract_address;
use crate::notify::Notifier;
use crate::types::{FormSettings, SubmissionEvent};

// Fixed seeds for accounts created by this integration.
const UNSET_CUSTOM_FIELDS: [&str; 1] = ["2"]; // date-of-birth stays unset
const SEED_CUSTOM_FIELD_ID: &str = "1";
const SEED_CUSTOM_FIELD_VALUE: &str = "A";
const EMAIL_CATEGORY_IDS: [&str; 4] = ["2", "3", "5", "4"];
const PHONE_TYPE_MOBILE: &str = "4";

/// Remote CRM surface the pipeline writes to
#[async_trait]
pub trait CrmApi: Send + Sync {
    async fn create_address(
        &self,
        input: &ServiceableAddressInput,
    ) -> sonar_api::Result<Option<String>>;

    async fn create_account(&self, input: &CreateAccountInput)
        -> sonar_api::Result<Option<String>>;
}

#[async_trait]
impl CrmApi for SonarClient {
    async fn create_address(
        &self,
        input: &ServiceableAddressInput,
    ) -> sonar_api::Result<Option<String>> {
        SonarClient::create_address(self, input).await
    }

    async fn create_account(
        &self,
        input: &CreateAccountInput,
    ) -> sonar_api::Result<Option<String>> {
        SonarClient::create_account(self, input).await
    }
}

pub struct SubmissionPipeline<A, N> {
    api: A,
    notifier: N,
}

impl<A: CrmApi, N: Notifier> SubmissionPipeline<A, N> {
    pub fn new(api: A, notifier: N) -> Self {
        Self { api, notifier }
    }

    /// Process one completed submission.
    ///
    /// Never returns an error: failures are logged and reported to the
    /// operator, and control always comes back to the adapter.
    pub async fn handle(&self, event: &SubmissionEvent) {
        let settings = &event.form_data.settings;
        if !settings.enabled() {
            return;
        }

        let address = match self.build_address(event) {
            Ok(address) => address,
            Err(e) => {
                error!(entry_id = event.entry_id(), error = %e, "Error creating address");
                self.report(settings, event, "Error creating address", &e.to_string())
                    .await;
                return;
            }
        };

        let address_id = match self.api.create_address(&address).await {
            Ok(Some(id)) => id,
            Ok(None) => {
                error!(entry_id = event.entry_id(), "No address ID returned from Sonar");
                self.report(
                    settings,
                    event,
                    "Unknown error creating address",
                    &debug_dump(&address),
                )
                .await;
                return;
            }
            Err(e) => {
                error!(entry_id = event.entry_id(), error = %e, "Error creating address");
                self.report(settings, event, "Error creating address", &e.to_string())
                    .await;
                return;
            }
        };

        info!(
            entry_id = event.entry_id(),
            address_id = %address_id,
            "Created serviceable address"
        );

        let input = match build_account_input(event, &address, address_id) {
            Ok(input) => input,
            Err(e) => {
                error!(entry_id = event.entry_id(), error = %e, "Error Creating Account");
                self.report(settings, event, "Error Creating Account", &e.to_string())
                    .await;
                return;
            }
        };

        match self.api.create_account(&input).await {
            Ok(Some(id)) => {
                info!(entry_id = event.entry_id(), account_id = %id, "Created Sonar account");
            }
            Ok(None) => {
                error!(entry_id = event.entry_id(), "No account ID returned from Sonar");
                self.report(
                    settings,
                    event,
                    "Unknown error creating account",
                    &debug_dump(&input),
                )
                .await;
            }
            Err(e) => {
                error!(entry_id = event.entry_id(), error = %e, "Error Creating Account");
                self.report(settings, event, "Error Creating Account", &e.to_string())
                    .await;
            }
        }
    }

    /// Extract the service address from the mapped field and overlay line2
    fn build_address(&self, event: &SubmissionEvent) -> Result<ServiceableAddressInput> {
        let settings = &event.form_data.settings;
        let field_id = required(
            settings.sonar_account_service_address.as_deref(),
            "the service address",
        )?;
        let field = event
            .field(field_id)
            .ok_or_else(|| BridgeError::MissingField(field_id.to_string()))?;

        let mut address = extract_address(&field.value)?;

        // A dedicated line2 field takes precedence; otherwise fall back to
        // the second line submitted on the address field itself.
        let line2 = settings
            .sonar_account_service_address_line2
            .as_deref()
            .filter(|id| !id.is_empty())
            .and_then(|id| event.field(id))
            .map(|f| f.value.clone())
            .filter(|v| !v.is_empty())
            .or_else(|| field.address2.clone().filter(|v| !v.is_empty()));
        if line2.is_some() {
            address.line2 = line2;
        }

        Ok(address)
    }

    /// Email the operator about a failed run.
    ///
    /// Silent when no error-report address is configured for the form.
    async fn report(
        &self,
        settings: &FormSettings,
        event: &SubmissionEvent,
        subject: &str,
        debug: &str,
    ) {
        let Some(to) = settings
            .sonar_error_report_email
            .as_deref()
            .filter(|s| !s.is_empty())
        else {
            return;
        };

        let form = settings.title();
        let entry_id = event.entry_id();
        let subject_line = format!(
            "[Sonar Automation Error / {}] Entry {} - {}",
            form, entry_id, subject
        );
        let body = format!(
            "Form: {}\nEntry ID: {}\nError: {}\n\nDebug Info:\n{}\n",
            form, entry_id, subject, debug
        );

        if let Err(e) = self.notifier.notify(to, &subject_line, &body).await {
            error!(entry_id, error = %e, "Failed to send operator notification");
        }
    }
}

/// Assemble the account input from mapped fields and the created address
fn build_account_input(
    event: &SubmissionEvent,
    address: &ServiceableAddressInput,
    address_id: String,
) -> Result<CreateAccountInput> {
    let settings = &event.form_data.settings;

    let name = field_value(event, settings.sonar_account_name.as_deref(), "the account name")?;
    let contact_name = field_value(event, settings.sonar_contact_name.as_deref(), "the contact name")?;
    let contact_email = field_value(
        event,
        settings.sonar_contact_email.as_deref(),
        "the contact email",
    )?;
    let contact_phone = field_value(
        event,
        settings.sonar_contact_phone.as_deref(),
        "the contact phone",
    )?;

    let account_status_id =
        required(settings.sonar_account_status.as_deref(), "the account status")?.to_string();
    let account_type_id =
        required(settings.sonar_account_type.as_deref(), "the account type")?.to_string();
    let company_id = required(settings.sonar_company.as_deref(), "the company")?.to_string();

    Ok(CreateAccountInput {
        serviceable_address_id: address_id,
        unset_custom_field_data: UNSET_CUSTOM_FIELDS.iter().map(|s| s.to_string()).collect(),
        custom_field_data: vec![CustomFieldValue {
            custom_field_id: SEED_CUSTOM_FIELD_ID.to_string(),
            value: SEED_CUSTOM_FIELD_VALUE.to_string(),
        }],
        account_group_ids: Vec::new(),
        account_status_id,
        account_type_id,
        company_id,
        mailing_address: address.mailing_address(),
        name,
        primary_contact: PrimaryContactInput {
            name: contact_name,
            email_address: contact_email,
            email_category_ids: EMAIL_CATEGORY_IDS.iter().map(|s| s.to_string()).collect(),
            phone_numbers: vec![PhoneNumberInput {
                country: address.country.clone(),
                number: contact_phone,
                phone_number_type_id: PHONE_TYPE_MOBILE.to_string(),
            }],
        },
    })
}

fn required<'a>(value: Option<&'a str>, role: &'static str) -> Result<&'a str> {
    value
        .filter(|v| !v.is_empty())
        .ok_or(BridgeError::MissingMapping(role))
}

fn field_value(event: &SubmissionEvent, mapping: Option<&str>, role: &'static str) -> Result<String> {
    let id = required(mapping, role)?;
    event
        .field(id)
        .map(|f| f.value.clone())
        .ok_or_else(|| BridgeError::MissingField(id.to_string()))
}

fn debug_dump<T: Serialize>(payload: &T) -> String {
    serde_json::to_string_pretty(payload).unwrap_or_else(|_| "<unserializable payload>".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::NotifyError;
    use base64::engine::general_purpose::STANDARD as BASE64;
    use base64::Engine;
    use serde_json::json;
    use std::sync::Mutex;

    struct FakeCrm {
        address_id: Option<String>,
        address_error: Option<String>,
        account_id: Option<String>,
        account_error: Option<String>,
        addresses: Mutex<Vec<ServiceableAddressInput>>,
        accounts: Mutex<Vec<CreateAccountInput>>,
    }

    impl FakeCrm {
        fn happy() -> Self {
            Self {
                address_id: Some("55".to_string()),
                address_error: None,
                account_id: Some("900".to_string()),
                account_error: None,
                addresses: Mutex::new(Vec::new()),
                accounts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl CrmApi for FakeCrm {
        async fn create_address(
            &self,
            input: &ServiceableAddressInput,
        ) -> sonar_api::Result<Option<String>> {
            self.addresses.lock().unwrap().push(input.clone());
            if let Some(msg) = &self.address_error {
                return Err(sonar_api::SonarError::Api(msg.clone()));
            }
            Ok(self.address_id.clone())
        }

        async fn create_account(
            &self,
            input: &CreateAccountInput,
        ) -> sonar_api::Result<Option<String>> {
            self.accounts.lock().unwrap().push(input.clone());
            if let Some(msg) = &self.account_error {
                return Err(sonar_api::SonarError::Api(msg.clone()));
            }
            Ok(self.account_id.clone())
        }
    }

    #[derive(Default)]
    struct FakeNotifier {
        sent: Mutex<Vec<(String, String, String)>>,
    }

    #[async_trait]
    impl Notifier for FakeNotifier {
        async fn notify(&self, to: &str, subject: &str, body: &str) -> std::result::Result<(), NotifyError> {
            self.sent
                .lock()
                .unwrap()
                .push((to.to_string(), subject.to_string(), body.to_string()));
            Ok(())
        }
    }

    fn encoded_address() -> String {
        BASE64.encode(
            serde_json::to_vec(&json!({
                "full": {
                    "address_components": [
                        {"long_name": "1", "short_name": "1", "types": ["street_number"]},
                        {"long_name": "Main Street", "short_name": "Main St", "types": ["route"]},
                        {"long_name": "Melbourne", "short_name": "Melbourne", "types": ["locality"]},
                        {"long_name": "Victoria", "short_name": "VIC", "types": ["administrative_area_level_1"]},
                        {"long_name": "Australia", "short_name": "AU", "types": ["country"]},
                        {"long_name": "3000", "short_name": "3000", "types": ["postal_code"]}
                    ],
                    "geometry": {"location": {"lat": -37.8136, "lng": 144.9631}}
                }
            }))
            .unwrap(),
        )
    }

    fn signup_event() -> SubmissionEvent {
        serde_json::from_value(json!({
            "fields": {
                "1": {"value": "Jane's Plan"},
                "2": {"value": "Jane Example"},
                "3": {"value": "jane@example.com"},
                "4": {"value": "0400000000"},
                "5": {"value": encoded_address()}
            },
            "entry_id": 41,
            "form_data": {
                "settings": {
                    "form_title": "Signup",
                    "sonar_enable": "1",
                    "sonar_error_report_email": "ops@example.com",
                    "sonar_company": "1",
                    "sonar_account_status": "10",
                    "sonar_account_type": "3",
                    "sonar_account_name": "1",
                    "sonar_account_service_address": "5",
                    "sonar_contact_name": "2",
                    "sonar_contact_email": "3",
                    "sonar_contact_phone": "4"
                }
            }
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_happy_path_creates_address_then_account() {
        let pipeline = SubmissionPipeline::new(FakeCrm::happy(), FakeNotifier::default());
        pipeline.handle(&signup_event()).await;

        let addresses = pipeline.api.addresses.lock().unwrap();
        let accounts = pipeline.api.accounts.lock().unwrap();
        assert_eq!(addresses.len(), 1);
        assert_eq!(accounts.len(), 1);

        let account = &accounts[0];
        assert_eq!(account.serviceable_address_id, "55");
        assert_eq!(account.name, "Jane's Plan");
        assert_eq!(account.company_id, "1");
        assert_eq!(account.account_status_id, "10");
        assert_eq!(account.account_type_id, "3");
        assert_eq!(account.primary_contact.name, "Jane Example");
        assert_eq!(account.primary_contact.email_address, "jane@example.com");
        assert_eq!(account.primary_contact.email_category_ids, vec!["2", "3", "5", "4"]);
        assert_eq!(account.primary_contact.phone_numbers[0].number, "0400000000");
        assert_eq!(account.primary_contact.phone_numbers[0].country, "AU");
        assert_eq!(account.primary_contact.phone_numbers[0].phone_number_type_id, "4");
        assert_eq!(account.unset_custom_field_data, vec!["2"]);
        assert_eq!(account.custom_field_data[0].custom_field_id, "1");
        assert_eq!(account.custom_field_data[0].value, "A");
        assert_eq!(account.mailing_address.line1, "1 Main Street");

        assert!(pipeline.notifier.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_disabled_form_is_a_no_op() {
        let mut event = signup_event();
        event.form_data.settings.sonar_enable = Some("0".to_string());

        let pipeline = SubmissionPipeline::new(FakeCrm::happy(), FakeNotifier::default());
        pipeline.handle(&event).await;

        assert!(pipeline.api.addresses.lock().unwrap().is_empty());
        assert!(pipeline.api.accounts.lock().unwrap().is_empty());
        assert!(pipeline.notifier.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_extraction_failure_notifies_and_makes_no_remote_calls() {
        let mut event = signup_event();
        event.fields.get_mut("5").unwrap().value = "not base64".to_string();

        let pipeline = SubmissionPipeline::new(FakeCrm::happy(), FakeNotifier::default());
        pipeline.handle(&event).await;

        assert!(pipeline.api.addresses.lock().unwrap().is_empty());
        assert!(pipeline.api.accounts.lock().unwrap().is_empty());

        let sent = pipeline.notifier.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "ops@example.com");
        assert_eq!(
            sent[0].1,
            "[Sonar Automation Error / Signup] Entry 41 - Error creating address"
        );
        assert!(sent[0].2.starts_with("Form: Signup\nEntry ID: 41\n"));
    }

    #[tokio::test]
    async fn test_null_address_id_notifies_and_skips_account() {
        let mut crm = FakeCrm::happy();
        crm.address_id = None;

        let pipeline = SubmissionPipeline::new(crm, FakeNotifier::default());
        pipeline.handle(&signup_event()).await;

        assert_eq!(pipeline.api.addresses.lock().unwrap().len(), 1);
        assert!(pipeline.api.accounts.lock().unwrap().is_empty());

        let sent = pipeline.notifier.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].1.ends_with("Unknown error creating address"));
        // The address payload rides along as debug context
        assert!(sent[0].2.contains("\"line1\": \"1 Main Street\""));
    }

    #[tokio::test]
    async fn test_address_fault_notifies_and_skips_account() {
        let mut crm = FakeCrm::happy();
        crm.address_error = Some("endpoint unreachable".to_string());

        let pipeline = SubmissionPipeline::new(crm, FakeNotifier::default());
        pipeline.handle(&signup_event()).await;

        assert!(pipeline.api.accounts.lock().unwrap().is_empty());

        let sent = pipeline.notifier.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].1.ends_with("- Error creating address"));
        assert!(sent[0].2.contains("endpoint unreachable"));
    }

    #[tokio::test]
    async fn test_account_fault_notifies() {
        let mut crm = FakeCrm::happy();
        crm.account_error = Some("validation failed".to_string());

        let pipeline = SubmissionPipeline::new(crm, FakeNotifier::default());
        pipeline.handle(&signup_event()).await;

        let sent = pipeline.notifier.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].1.ends_with("- Error Creating Account"));
    }

    #[tokio::test]
    async fn test_null_account_id_notifies_with_input_dump() {
        let mut crm = FakeCrm::happy();
        crm.account_id = None;

        let pipeline = SubmissionPipeline::new(crm, FakeNotifier::default());
        pipeline.handle(&signup_event()).await;

        let sent = pipeline.notifier.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].1.ends_with("Unknown error creating account"));
        assert!(sent[0].2.contains("\"serviceable_address_id\": \"55\""));
    }

    #[tokio::test]
    async fn test_failure_without_report_email_stays_silent() {
        let mut event = signup_event();
        event.form_data.settings.sonar_error_report_email = None;
        let mut crm = FakeCrm::happy();
        crm.address_id = None;

        let pipeline = SubmissionPipeline::new(crm, FakeNotifier::default());
        pipeline.handle(&event).await;

        assert!(pipeline.notifier.sent.lock().unwrap().is_empty());
        assert!(pipeline.api.accounts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_contact_mapping_fails_account_stage() {
        let mut event = signup_event();
        event.form_data.settings.sonar_contact_email = None;

        let pipeline = SubmissionPipeline::new(FakeCrm::happy(), FakeNotifier::default());
        pipeline.handle(&event).await;

        // Address was still created; the account stage failed before the call
        assert_eq!(pipeline.api.addresses.lock().unwrap().len(), 1);
        assert!(pipeline.api.accounts.lock().unwrap().is_empty());

        let sent = pipeline.notifier.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].1.ends_with("- Error Creating Account"));
    }

    #[tokio::test]
    async fn test_line2_field_takes_precedence_over_address2() {
        let mut event = signup_event();
        event.form_data.settings.sonar_account_service_address_line2 = Some("6".to_string());
        event.fields.insert(
            "6".to_string(),
            serde_json::from_value(json!({"value": "Unit 7"})).unwrap(),
        );
        event.fields.get_mut("5").unwrap().address2 = Some("Unit 9".to_string());

        let pipeline = SubmissionPipeline::new(FakeCrm::happy(), FakeNotifier::default());
        pipeline.handle(&event).await;

        let addresses = pipeline.api.addresses.lock().unwrap();
        assert_eq!(addresses[0].line2.as_deref(), Some("Unit 7"));
    }

    #[tokio::test]
    async fn test_line2_falls_back_to_address_payload() {
        let mut event = signup_event();
        event.fields.get_mut("5").unwrap().address2 = Some("Unit 9".to_string());

        let pipeline = SubmissionPipeline::new(FakeCrm::happy(), FakeNotifier::default());
        pipeline.handle(&event).await;

        let addresses = pipeline.api.addresses.lock().unwrap();
        assert_eq!(addresses[0].line2.as_deref(), Some("Unit 9"));
    }

    #[tokio::test]
    async fn test_rerun_creates_duplicates() {
        // No dedup guard exists: the same submission delivered twice makes
        // two independent address/account pairs.
        let pipeline = SubmissionPipeline::new(FakeCrm::happy(), FakeNotifier::default());
        let event = signup_event();
        pipeline.handle(&event).await;
        pipeline.handle(&event).await;

        assert_eq!(pipeline.api.addresses.lock().unwrap().len(), 2);
        assert_eq!(pipeline.api.accounts.lock().unwrap().len(), 2);
        assert!(pipeline.notifier.sent.lock().unwrap().is_empty());
    }
}
