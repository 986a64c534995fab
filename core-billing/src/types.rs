//! Billing domain types and their client-side validation rules.

use chrono::{DateTime, Utc};
use core_auth::ValidationErrors;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Accepts amounts sent either as JSON numbers or as decimal strings.
fn amount<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(value) => Ok(value),
        Raw::Text(text) => text
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid amount '{}'", text))),
    }
}

// =============================================================================
// Organizations
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrganizationKind {
    School,
    Coaching,
    Academy,
}

impl OrganizationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrganizationKind::School => "school",
            OrganizationKind::Coaching => "coaching",
            OrganizationKind::Academy => "academy",
        }
    }
}

impl fmt::Display for OrganizationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: OrganizationKind,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(deserialize_with = "amount")]
    pub monthly_fee: f64,
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_true() -> bool {
    true
}

/// Body of `POST /organizations`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrganization {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: OrganizationKind,
    pub description: String,
    pub address: String,
    pub monthly_fee: f64,
}

impl NewOrganization {
    pub fn validate(&self) -> std::result::Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        check_name(&mut errors, &self.name);
        check_description(&mut errors, &self.description);
        check_address(&mut errors, &self.address);
        check_fee(&mut errors, self.monthly_fee);
        errors.into_result()
    }
}

/// Body of `PUT /organizations/:id`. Only the fields that are set are sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<OrganizationKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monthly_fee: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

impl OrganizationUpdate {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    pub fn validate(&self) -> std::result::Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if self.is_empty() {
            errors.add("organization", "Nothing to update");
        }
        if let Some(name) = &self.name {
            check_name(&mut errors, name);
        }
        if let Some(description) = &self.description {
            check_description(&mut errors, description);
        }
        if let Some(address) = &self.address {
            check_address(&mut errors, address);
        }
        if let Some(fee) = self.monthly_fee {
            check_fee(&mut errors, fee);
        }
        errors.into_result()
    }
}

fn check_name(errors: &mut ValidationErrors, name: &str) {
    errors.require_min_len("name", name, 2, "Name must be at least 2 characters");
}

fn check_description(errors: &mut ValidationErrors, description: &str) {
    errors.require_min_len(
        "description",
        description,
        10,
        "Description must be at least 10 characters",
    );
}

fn check_address(errors: &mut ValidationErrors, address: &str) {
    errors.require_min_len("address", address, 5, "Address must be at least 5 characters");
}

fn check_fee(errors: &mut ValidationErrors, fee: f64) {
    errors.require_positive("monthlyFee", fee, "Monthly fee must be greater than 0");
}

// =============================================================================
// Subscriptions
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Pending,
    Active,
    Cancelled,
    Expired,
}

impl SubscriptionStatus {
    pub const ALL: [SubscriptionStatus; 4] = [
        SubscriptionStatus::Active,
        SubscriptionStatus::Pending,
        SubscriptionStatus::Cancelled,
        SubscriptionStatus::Expired,
    ];

    /// Only an active subscription can be cancelled.
    pub fn can_cancel(&self) -> bool {
        matches!(self, SubscriptionStatus::Active)
    }

    /// A cancelled or expired subscription can be renewed.
    pub fn can_renew(&self) -> bool {
        matches!(self, SubscriptionStatus::Cancelled | SubscriptionStatus::Expired)
    }

    /// Display label, e.g. `Active`.
    pub fn label(&self) -> &'static str {
        match self {
            SubscriptionStatus::Pending => "Pending",
            SubscriptionStatus::Active => "Active",
            SubscriptionStatus::Cancelled => "Cancelled",
            SubscriptionStatus::Expired => "Expired",
        }
    }
}

/// Organization fields embedded in a subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationSummary {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: OrganizationKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub id: String,
    pub organization_id: String,
    #[serde(default)]
    pub user_id: Option<String>,
    pub status: SubscriptionStatus,
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "amount")]
    pub amount: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub organization: Option<OrganizationSummary>,
}

/// Body of `POST /subscriptions`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSubscription {
    pub organization_id: String,
    pub amount: f64,
}

impl NewSubscription {
    pub fn validate(&self) -> std::result::Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.require_min_len(
            "organizationId",
            &self.organization_id,
            1,
            "Please select an organization",
        );
        errors.require_positive("amount", self.amount, "Amount must be greater than 0");
        errors.into_result()
    }
}

// =============================================================================
// Payments
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Stripe,
    Bkash,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Stripe => "stripe",
            PaymentMethod::Bkash => "bkash",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The subscription a payment belongs to, as embedded by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionRef {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: String,
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "amount")]
    pub amount: f64,
    pub method: PaymentMethod,
    #[serde(rename = "type", default)]
    pub payment_type: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub subscription: Option<SubscriptionRef>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    pub fn subscription_id(&self) -> Option<&str> {
        self.subscription.as_ref().map(|s| s.id.as_str())
    }
}

/// Body of `POST /payments`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPayment {
    pub subscription_id: String,
    pub amount: f64,
    pub method: PaymentMethod,
}

impl NewPayment {
    pub fn validate(&self) -> std::result::Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.require_min_len(
            "subscriptionId",
            &self.subscription_id,
            1,
            "Subscription is required",
        );
        errors.require_positive("amount", self.amount, "Amount must be greater than 0");
        errors.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn new_org() -> NewOrganization {
        NewOrganization {
            name: "Sunrise Academy".to_string(),
            kind: OrganizationKind::Academy,
            description: "Evening classes for adults".to_string(),
            address: "12 Lake Road".to_string(),
            monthly_fee: 1500.0,
        }
    }

    #[test]
    fn test_organization_wire_format() {
        let org: Organization = serde_json::from_value(json!({
            "id": "o-1",
            "name": "Sunrise Academy",
            "type": "academy",
            "description": "Evening classes",
            "address": "12 Lake Road",
            "monthlyFee": "1500.50",
            "isActive": false,
            "createdAt": "2024-01-05T10:00:00.000Z",
            "updatedAt": "2024-02-01T08:30:00Z"
        }))
        .unwrap();

        assert_eq!(org.kind, OrganizationKind::Academy);
        assert_eq!(org.monthly_fee, 1500.5);
        assert!(!org.is_active);

        let body = serde_json::to_value(new_org()).unwrap();
        assert_eq!(body["type"], "academy");
        assert_eq!(body["monthlyFee"], 1500.0);
    }

    #[test]
    fn test_new_organization_rules() {
        assert!(new_org().validate().is_ok());

        let invalid = NewOrganization {
            name: "S".to_string(),
            description: "short".to_string(),
            address: "x".to_string(),
            monthly_fee: 0.0,
            ..new_org()
        };
        let errors = invalid.validate().unwrap_err();
        assert_eq!(errors.errors().len(), 4);
        assert_eq!(
            errors.message_for("monthlyFee"),
            Some("Monthly fee must be greater than 0")
        );
    }

    #[test]
    fn test_organization_update_sends_only_set_fields() {
        let update = OrganizationUpdate {
            monthly_fee: Some(2000.0),
            is_active: Some(false),
            ..Default::default()
        };
        assert!(update.validate().is_ok());
        assert_eq!(
            serde_json::to_value(&update).unwrap(),
            json!({ "monthlyFee": 2000.0, "isActive": false })
        );

        assert!(OrganizationUpdate::default().validate().is_err());
        let bad = OrganizationUpdate {
            name: Some("A".to_string()),
            ..Default::default()
        };
        assert!(bad.validate().unwrap_err().message_for("name").is_some());
    }

    #[test]
    fn test_status_policy() {
        assert!(SubscriptionStatus::Active.can_cancel());
        assert!(!SubscriptionStatus::Pending.can_cancel());
        assert!(!SubscriptionStatus::Cancelled.can_cancel());

        assert!(SubscriptionStatus::Cancelled.can_renew());
        assert!(SubscriptionStatus::Expired.can_renew());
        assert!(!SubscriptionStatus::Active.can_renew());
        assert!(!SubscriptionStatus::Pending.can_renew());
    }

    #[test]
    fn test_subscription_with_embedded_organization() {
        let sub: Subscription = serde_json::from_value(json!({
            "id": "s-1",
            "organizationId": "o-1",
            "userId": "u-1",
            "status": "active",
            "startDate": "2024-01-01T00:00:00Z",
            "endDate": null,
            "amount": 1200,
            "createdAt": "2024-01-01T00:00:00Z",
            "updatedAt": "2024-01-01T00:00:00Z",
            "organization": { "name": "Sunrise Academy", "type": "academy" }
        }))
        .unwrap();

        assert_eq!(sub.status, SubscriptionStatus::Active);
        assert!(sub.end_date.is_none());
        assert_eq!(sub.organization.unwrap().name, "Sunrise Academy");
    }

    #[test]
    fn test_new_subscription_rules() {
        let errors = NewSubscription {
            organization_id: " ".to_string(),
            amount: -5.0,
        }
        .validate()
        .unwrap_err();
        assert_eq!(
            errors.message_for("organizationId"),
            Some("Please select an organization")
        );
        assert!(errors.message_for("amount").is_some());
    }

    #[test]
    fn test_payment_wire_format() {
        let payment: Payment = serde_json::from_value(json!({
            "id": "p-1",
            "date": "2024-03-02T00:00:00Z",
            "amount": "99.90",
            "method": "bkash",
            "type": "monthly",
            "status": "completed",
            "subscription": { "id": "s-1", "status": "active", "amount": 1200 },
            "createdAt": "2024-03-02T00:00:00Z",
            "updatedAt": "2024-03-02T00:00:00Z"
        }))
        .unwrap();

        assert_eq!(payment.method, PaymentMethod::Bkash);
        assert_eq!(payment.amount, 99.9);
        assert_eq!(payment.subscription_id(), Some("s-1"));

        let body = serde_json::to_value(NewPayment {
            subscription_id: "s-1".to_string(),
            amount: 10.0,
            method: PaymentMethod::Stripe,
        })
        .unwrap();
        assert_eq!(body, json!({ "subscriptionId": "s-1", "amount": 10.0, "method": "stripe" }));
    }

    #[test]
    fn test_rejects_unknown_payment_method() {
        let result: std::result::Result<PaymentMethod, _> = serde_json::from_value(json!("paypal"));
        assert!(result.is_err());
    }
}
