//! # Billing Module
//!
//! Organizations, subscriptions and payments for the billing console.
//!
//! ## Overview
//!
//! - [`BillingApi`] wraps every billing endpoint with client-side
//!   validation, cache invalidation and [`BillingEvent`] emission.
//! - [`QueryCache`] keeps recent GET results for the current session only.
//! - [`PageParams`] / [`Paginated`] model the `?page=&limit=` lists.
//! - [`DashboardStats`] summarizes subscriptions and payments.
//!
//! [`BillingEvent`]: core_runtime::events::BillingEvent

pub mod api;
pub mod cache;
pub mod dashboard;
pub mod error;
pub mod pagination;
pub mod types;

pub use api::BillingApi;
pub use cache::QueryCache;
pub use dashboard::{DashboardStats, MonthlyRevenue, StatusCount};
pub use error::{BillingError, Result};
pub use pagination::{PageMeta, PageParams, Paginated};
pub use types::{
    NewOrganization, NewPayment, NewSubscription, Organization, OrganizationKind,
    OrganizationSummary, OrganizationUpdate, Payment, PaymentMethod, Subscription,
    SubscriptionRef, SubscriptionStatus,
};
