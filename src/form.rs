//! The multi-step ad creation flow, as an explicit state machine.
//!
//! ```text
//! Idle -> CredentialsEntered -> MethodsFetching -> MethodsFetched
//!      -> MethodSelected -> Submitting -> Created | Error
//! ```
//!
//! The form never performs io. `begin_fetch` and `begin_submit` hand back the
//! request to send to the proxy, and `finish_fetch` / `finish_submit` take the
//! outcome. From `Error` the user can retry anything that was allowed in the
//! state the failed step started from.

use serde_json::Value;

use crate::{
    AdDetail, AdPayload, AdvancedFilters, Credentials, DisclaimerGate, ExchangeResponse, FilterField,
    FixedAdDefaults, FormError, PaymentMethod, TradeMethodTagging,
    merge::build_ad_payload_tagged,
    proxy::{AdDetailsRequest, CreateAdRequest, ProxyError},
};

/// States of the ad form
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FormState {
    /// Nothing entered yet
    Idle,
    /// Api key and secret are filled in
    CredentialsEntered,
    /// Waiting for the ad details lookup
    MethodsFetching,
    /// Payment methods are known
    MethodsFetched,
    /// A payment method is selected, filters can be edited
    MethodSelected,
    /// Waiting for ad creation
    Submitting,
    /// The ad was created
    Created,
    /// The last step failed
    Error,
}

/// State and inputs of one ad creation session
#[derive(Debug)]
pub struct AdForm {
    state: FormState,
    /// State to resume from after an error
    recover_to: FormState,
    creds: Credentials,
    ad_id: String,
    methods: Vec<PaymentMethod>,
    selected: Option<String>,
    filters: AdvancedFilters,
    defaults: FixedAdDefaults,
    tagging: TradeMethodTagging,
    message: String,
}

impl AdForm {
    /// Start a session. The disclaimer must have been acknowledged.
    pub fn new(gate: &DisclaimerGate, tagging: TradeMethodTagging) -> Result<Self, FormError> {
        if !gate.is_acknowledged() {
            return Err(FormError::NotAcknowledged(gate.remaining()));
        }
        Ok(Self {
            state: FormState::Idle,
            recover_to: FormState::Idle,
            creds: Credentials::default(),
            ad_id: String::new(),
            methods: Vec::new(),
            selected: None,
            filters: AdvancedFilters::default(),
            defaults: FixedAdDefaults::default(),
            tagging,
            message: String::new(),
        })
    }

    /// Current state
    pub fn state(&self) -> FormState {
        self.state
    }

    /// Latest status message for the user
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Payment methods from the last successful lookup
    pub fn methods(&self) -> &[PaymentMethod] {
        &self.methods
    }

    /// Currently selected payment method
    pub fn selected_method(&self) -> Option<&PaymentMethod> {
        let pay_id = self.selected.as_deref()?;
        self.methods.iter().find(|m| m.pay_id == pay_id)
    }

    /// Current filter values
    pub fn filters(&self) -> &AdvancedFilters {
        &self.filters
    }

    /// The fixed ad settings, for review
    pub fn defaults(&self) -> &FixedAdDefaults {
        &self.defaults
    }

    /// Whether a details lookup may be started now
    pub fn can_fetch(&self) -> bool {
        self.allowed(&[FormState::CredentialsEntered, FormState::MethodsFetched, FormState::MethodSelected])
            && !self.creds.is_incomplete()
            && !self.ad_id.is_empty()
    }

    /// Whether the ad may be submitted now
    pub fn can_submit(&self) -> bool {
        self.allowed(&[FormState::MethodSelected]) && !self.creds.is_incomplete()
    }

    // In the error state, permissions are those of the state we recover to
    fn effective_state(&self) -> FormState {
        if self.state == FormState::Error {
            self.recover_to
        } else {
            self.state
        }
    }

    fn allowed(&self, states: &[FormState]) -> bool {
        states.contains(&self.effective_state())
    }

    fn require(&self, action: &'static str, states: &[FormState]) -> Result<(), FormError> {
        if self.allowed(states) {
            Ok(())
        } else {
            Err(FormError::InvalidTransition {
                action,
                state: self.state,
            })
        }
    }

    fn enter(&mut self, state: FormState) {
        log::debug!("form: {:?} -> {:?}", self.state, state);
        self.state = state;
        if state != FormState::Error {
            self.recover_to = state;
        }
    }

    fn fail(&mut self, recover_to: FormState, err: impl std::fmt::Display) {
        self.message = format!("Error: {}", err);
        self.recover_to = recover_to;
        log::debug!("form: {:?} -> Error", self.state);
        self.state = FormState::Error;
    }

    /// Enter api credentials. Entering new credentials forgets any methods
    /// fetched with the old ones.
    pub fn enter_credentials(&mut self, creds: Credentials) -> Result<(), FormError> {
        self.require(
            "enter credentials",
            &[
                FormState::Idle,
                FormState::CredentialsEntered,
                FormState::MethodsFetched,
                FormState::MethodSelected,
            ],
        )?;
        if creds != self.creds {
            self.methods.clear();
            self.selected = None;
        }
        self.creds = creds;
        self.enter(if self.creds.is_incomplete() {
            FormState::Idle
        } else {
            FormState::CredentialsEntered
        });
        Ok(())
    }

    /// Enter the number of an existing ad to take payment methods from
    pub fn set_ad_id(&mut self, ad_id: impl Into<String>) -> Result<(), FormError> {
        if matches!(self.state, FormState::MethodsFetching | FormState::Submitting | FormState::Created) {
            return Err(FormError::InvalidTransition {
                action: "change the ad id",
                state: self.state,
            });
        }
        self.ad_id = ad_id.into().trim().to_string();
        Ok(())
    }

    /// Start looking up payment methods
    pub fn begin_fetch(&mut self) -> Result<AdDetailsRequest, FormError> {
        self.require(
            "fetch payment methods",
            &[
                FormState::Idle,
                FormState::CredentialsEntered,
                FormState::MethodsFetched,
                FormState::MethodSelected,
            ],
        )?;
        if self.creds.is_incomplete() || self.ad_id.is_empty() {
            self.message = FormError::MissingFields.to_string();
            return Err(FormError::MissingFields);
        }
        self.message.clear();
        self.enter(FormState::MethodsFetching);
        Ok(AdDetailsRequest::new(&self.creds, self.ad_id.clone()))
    }

    /// Record the outcome of a payment method lookup
    pub fn finish_fetch(&mut self, result: Result<Value, ProxyError>) -> Result<(), FormError> {
        self.require("finish fetching", &[FormState::MethodsFetching])?;
        match result {
            Ok(details) => match payment_methods(&details) {
                Some(methods) => {
                    self.message = format!("Found {} payment method(s)", methods.len());
                    self.methods = methods;
                    self.selected = None;
                    self.enter(FormState::MethodsFetched);
                }
                None => {
                    self.message = "No payment methods found for this ad".to_string();
                    self.methods.clear();
                    self.selected = None;
                    self.enter(FormState::CredentialsEntered);
                }
            },
            Err(err) => {
                let recover_to = if self.methods.is_empty() {
                    FormState::CredentialsEntered
                } else if self.selected.is_some() {
                    FormState::MethodSelected
                } else {
                    FormState::MethodsFetched
                };
                self.fail(recover_to, err);
            }
        }
        Ok(())
    }

    /// Select one of the fetched payment methods by pay id
    pub fn select_method(&mut self, pay_id: &str) -> Result<(), FormError> {
        self.require("select a payment method", &[FormState::MethodsFetched, FormState::MethodSelected])?;
        if !self.methods.iter().any(|m| m.pay_id == pay_id) {
            return Err(FormError::UnknownPayId(pay_id.to_string()));
        }
        self.selected = Some(pay_id.to_string());
        self.enter(FormState::MethodSelected);
        Ok(())
    }

    /// Set a filter from user input. Only possible once a method is selected.
    pub fn set_filter(&mut self, field: FilterField, input: &str) -> Result<(), FormError> {
        self.require("edit filters", &[FormState::MethodSelected])?;
        self.filters.set_from_input(field, input);
        Ok(())
    }

    /// The payload that submitting now would send
    pub fn payload(&self) -> Result<AdPayload, FormError> {
        let method = self.selected_method().ok_or(FormError::NoMethodSelected)?;
        build_ad_payload_tagged(&self.defaults, &self.filters, method, self.tagging)
            .map_err(|err| FormError::Payload(err.to_string()))
    }

    /// Start creating the ad
    pub fn begin_submit(&mut self) -> Result<CreateAdRequest, FormError> {
        self.require("submit", &[FormState::MethodsFetched, FormState::MethodSelected])?;
        if self.selected.is_none() {
            self.message = FormError::NoMethodSelected.to_string();
            return Err(FormError::NoMethodSelected);
        }
        let payload = self.payload()?;
        self.message.clear();
        self.enter(FormState::Submitting);
        Ok(CreateAdRequest::new(&self.creds, payload.into_value()))
    }

    /// Record the outcome of ad creation
    pub fn finish_submit(&mut self, result: Result<Value, ProxyError>) -> Result<(), FormError> {
        self.require("finish submitting", &[FormState::Submitting])?;
        match result {
            Ok(_) => {
                self.message = "Ad created successfully!".to_string();
                self.enter(FormState::Created);
            }
            Err(err) => self.fail(FormState::MethodSelected, err),
        }
        Ok(())
    }

    /// Start over for another ad, keeping credentials and filters
    pub fn reset(&mut self) -> Result<(), FormError> {
        self.require("create another ad", &[FormState::Created])?;
        self.methods.clear();
        self.selected = None;
        self.ad_id.clear();
        self.message.clear();
        self.enter(FormState::CredentialsEntered);
        Ok(())
    }
}

/// Pull `data.tradeMethods` out of an ad details response
pub fn payment_methods(details: &Value) -> Option<Vec<PaymentMethod>> {
    let response: ExchangeResponse<AdDetail> = serde_json::from_value(details.clone()).ok()?;
    response.data?.trade_methods
}
