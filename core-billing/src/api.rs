//! Typed client for organizations, subscriptions and payments.
//!
//! All calls go through the [`AuthenticatedClient`], so they carry the
//! session token and survive an access-token expiry transparently. GET
//! results are served from the [`QueryCache`] while fresh; every successful
//! mutation invalidates what it made stale and emits a [`BillingEvent`].

use crate::cache::QueryCache;
use crate::dashboard::DashboardStats;
use crate::error::{BillingError, Result};
use crate::pagination::{PageParams, Paginated};
use crate::types::{
    NewOrganization, NewPayment, NewSubscription, Organization, OrganizationUpdate, Payment,
    Subscription,
};
use core_auth::{ApiRequest, AuthenticatedClient, ValidationErrors};
use core_runtime::events::{BillingEvent, CoreEvent, EventBus};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, instrument};

const ORGANIZATIONS: &str = "/organizations";
const SUBSCRIPTIONS: &str = "/subscriptions";
const PAYMENTS: &str = "/payments";

pub struct BillingApi {
    client: Arc<AuthenticatedClient>,
    cache: Arc<QueryCache>,
    event_bus: EventBus,
}

impl BillingApi {
    pub fn new(client: Arc<AuthenticatedClient>, cache: Arc<QueryCache>, event_bus: EventBus) -> Self {
        Self {
            client,
            cache,
            event_bus,
        }
    }

    pub fn cache(&self) -> &Arc<QueryCache> {
        &self.cache
    }

    // =========================================================================
    // Organizations
    // =========================================================================

    #[instrument(skip(self))]
    pub async fn list_organizations(&self, params: PageParams) -> Result<Paginated<Organization>> {
        self.get_cached(ORGANIZATIONS, &params.to_query()).await
    }

    #[instrument(skip(self, organization), fields(name = %organization.name, kind = %organization.kind))]
    pub async fn create_organization(&self, organization: NewOrganization) -> Result<Organization> {
        organization.validate()?;

        let created: Organization = self.send(ApiRequest::post(ORGANIZATIONS), &organization).await?;
        self.cache.invalidate_prefix(ORGANIZATIONS).await;

        info!(organization_id = %created.id, "Organization created");
        self.emit(BillingEvent::OrganizationCreated {
            organization_id: created.id.clone(),
            name: created.name.clone(),
        });
        Ok(created)
    }

    #[instrument(skip(self, update))]
    pub async fn update_organization(
        &self,
        organization_id: &str,
        update: OrganizationUpdate,
    ) -> Result<Organization> {
        require_id("organizationId", organization_id)?;
        update.validate()?;

        let path = format!("{}/{}", ORGANIZATIONS, organization_id);
        let updated: Organization = self.send(ApiRequest::put(path), &update).await?;
        self.cache.invalidate_prefix(ORGANIZATIONS).await;
        // Subscriptions embed the organization name and type.
        self.cache.invalidate_prefix(SUBSCRIPTIONS).await;

        info!("Organization updated");
        self.emit(BillingEvent::OrganizationUpdated {
            organization_id: updated.id.clone(),
        });
        Ok(updated)
    }

    // =========================================================================
    // Subscriptions
    // =========================================================================

    #[instrument(skip(self))]
    pub async fn list_subscriptions(&self, params: PageParams) -> Result<Paginated<Subscription>> {
        self.get_cached(SUBSCRIPTIONS, &params.to_query()).await
    }

    #[instrument(skip(self, subscription), fields(organization_id = %subscription.organization_id))]
    pub async fn create_subscription(&self, subscription: NewSubscription) -> Result<Subscription> {
        subscription.validate()?;

        let created: Subscription = self.send(ApiRequest::post(SUBSCRIPTIONS), &subscription).await?;
        self.cache.invalidate_prefix(SUBSCRIPTIONS).await;

        info!(subscription_id = %created.id, "Subscription created");
        self.emit(BillingEvent::SubscriptionCreated {
            subscription_id: created.id.clone(),
            organization_id: created.organization_id.clone(),
            amount: created.amount,
        });
        Ok(created)
    }

    /// Cancels an active subscription.
    ///
    /// # Errors
    ///
    /// `BillingError::Validation` without any request when the subscription
    /// is not active.
    #[instrument(skip(self, subscription), fields(subscription_id = %subscription.id, status = ?subscription.status))]
    pub async fn cancel_subscription(&self, subscription: &Subscription) -> Result<Subscription> {
        if !subscription.status.can_cancel() {
            return Err(ValidationErrors::single(
                "status",
                "Only active subscriptions can be cancelled",
            )
            .into());
        }

        let path = format!("{}/{}/cancel", SUBSCRIPTIONS, subscription.id);
        let cancelled: Subscription = self.client.post_empty(&path).await?;
        self.cache.invalidate_prefix(SUBSCRIPTIONS).await;

        info!("Subscription cancelled");
        self.emit(BillingEvent::SubscriptionCancelled {
            subscription_id: cancelled.id.clone(),
        });
        Ok(cancelled)
    }

    /// Renews a cancelled or expired subscription.
    #[instrument(skip(self, subscription), fields(subscription_id = %subscription.id, status = ?subscription.status))]
    pub async fn renew_subscription(&self, subscription: &Subscription) -> Result<Subscription> {
        if !subscription.status.can_renew() {
            return Err(ValidationErrors::single(
                "status",
                "Only cancelled or expired subscriptions can be renewed",
            )
            .into());
        }

        let path = format!("{}/{}/renew", SUBSCRIPTIONS, subscription.id);
        let renewed: Subscription = self.client.post_empty(&path).await?;
        self.cache.invalidate_prefix(SUBSCRIPTIONS).await;

        info!("Subscription renewed");
        self.emit(BillingEvent::SubscriptionRenewed {
            subscription_id: renewed.id.clone(),
        });
        Ok(renewed)
    }

    // =========================================================================
    // Payments
    // =========================================================================

    #[instrument(skip(self, payment), fields(subscription_id = %payment.subscription_id, method = %payment.method))]
    pub async fn record_payment(&self, payment: NewPayment) -> Result<Payment> {
        payment.validate()?;

        let recorded: Payment = self.send(ApiRequest::post(PAYMENTS), &payment).await?;
        self.cache.invalidate_prefix(PAYMENTS).await;
        self.cache.invalidate_prefix(SUBSCRIPTIONS).await;

        info!(payment_id = %recorded.id, "Payment recorded");
        self.emit(BillingEvent::PaymentRecorded {
            payment_id: recorded.id.clone(),
            subscription_id: payment.subscription_id,
            amount: recorded.amount,
            method: recorded.method.as_str().to_string(),
        });
        Ok(recorded)
    }

    #[instrument(skip(self))]
    pub async fn list_payments(&self, params: PageParams) -> Result<Paginated<Payment>> {
        self.get_cached(PAYMENTS, &params.to_query()).await
    }

    /// Payment history of one subscription.
    #[instrument(skip(self))]
    pub async fn list_subscription_payments(
        &self,
        subscription_id: &str,
        params: PageParams,
    ) -> Result<Paginated<Payment>> {
        require_id("subscriptionId", subscription_id)?;
        let path = format!("{}/subscription/{}", PAYMENTS, subscription_id);
        self.get_cached(&path, &params.to_query()).await
    }

    // =========================================================================
    // Dashboard
    // =========================================================================

    /// Fetches one page of each collection and summarizes it.
    #[instrument(skip(self))]
    pub async fn dashboard_stats(&self, params: PageParams) -> Result<DashboardStats> {
        let (subscriptions, payments, organizations) = tokio::try_join!(
            self.list_subscriptions(params),
            self.list_payments(params),
            self.list_organizations(params),
        )?;

        Ok(DashboardStats::compute(
            &subscriptions.items,
            subscriptions.meta.total,
            &payments.items,
            organizations.meta.total,
        ))
    }

    async fn get_cached<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(String, String)],
    ) -> Result<T> {
        let key = QueryCache::key(path, query);
        if let Some(value) = self.cache.get(&key).await {
            debug!(key = %key, "Serving cached response");
            return decode(&key, value);
        }

        let generation = self.cache.generation();
        let value: serde_json::Value = self.client.get_json(path, query).await?;
        let decoded = decode(&key, value.clone())?;
        self.cache.put_if_current(generation, key, value).await;
        Ok(decoded)
    }

    async fn send<B: Serialize, T: DeserializeOwned>(&self, request: ApiRequest, body: &B) -> Result<T> {
        let request = request.json(body)?;
        Ok(self.client.send_json(request).await?)
    }

    fn emit(&self, event: BillingEvent) {
        let _ = self.event_bus.emit(CoreEvent::Billing(event));
    }
}

fn decode<T: DeserializeOwned>(context: &str, value: serde_json::Value) -> Result<T> {
    serde_json::from_value(value).map_err(|source| BillingError::Decode {
        context: context.to_string(),
        source,
    })
}

fn require_id(field: &str, id: &str) -> Result<()> {
    let mut errors = ValidationErrors::new();
    errors.require_min_len(field, id, 1, "Identifier is required");
    Ok(errors.into_result()?)
}
