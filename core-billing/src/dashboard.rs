//! Summary figures for the dashboard page.

use crate::types::{Payment, Subscription, SubscriptionStatus};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCount {
    /// Display label such as `Active`
    pub name: String,
    pub value: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyRevenue {
    /// Abbreviated month name, e.g. `Jan`
    pub month: String,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_subscriptions: u64,
    pub active_subscriptions: u64,
    pub total_revenue: f64,
    pub total_organizations: u64,
    /// Always Active, Pending, Cancelled, Expired in that order
    pub subscriptions_by_status: Vec<StatusCount>,
    /// Months in order of first appearance among the payments
    pub revenue_by_month: Vec<MonthlyRevenue>,
}

impl DashboardStats {
    /// # Arguments
    ///
    /// * `total_subscriptions` - Server-side total; the slice may be one page
    /// * `total_organizations` - Server-side total
    pub fn compute(
        subscriptions: &[Subscription],
        total_subscriptions: u64,
        payments: &[Payment],
        total_organizations: u64,
    ) -> Self {
        let count = |status: SubscriptionStatus| {
            subscriptions.iter().filter(|s| s.status == status).count() as u64
        };

        let subscriptions_by_status = SubscriptionStatus::ALL
            .iter()
            .map(|status| StatusCount {
                name: status.label().to_string(),
                value: count(*status),
            })
            .collect();

        let mut revenue_by_month: Vec<MonthlyRevenue> = Vec::new();
        for payment in payments {
            let month = payment.created_at.format("%b").to_string();
            match revenue_by_month.iter_mut().find(|m| m.month == month) {
                Some(existing) => existing.amount += payment.amount,
                None => revenue_by_month.push(MonthlyRevenue {
                    month,
                    amount: payment.amount,
                }),
            }
        }

        Self {
            total_subscriptions,
            active_subscriptions: count(SubscriptionStatus::Active),
            total_revenue: payments.iter().map(|p| p.amount).sum(),
            total_organizations,
            subscriptions_by_status,
            revenue_by_month,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PaymentMethod, SubscriptionRef};
    use chrono::{TimeZone, Utc};

    fn subscription(id: &str, status: SubscriptionStatus) -> Subscription {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        Subscription {
            id: id.to_string(),
            organization_id: "o-1".to_string(),
            user_id: None,
            status,
            start_date: None,
            end_date: None,
            amount: 100.0,
            created_at: at,
            updated_at: at,
            organization: None,
        }
    }

    fn payment(amount: f64, month: u32) -> Payment {
        let at = Utc.with_ymd_and_hms(2024, month, 15, 12, 0, 0).unwrap();
        Payment {
            id: format!("p-{}-{}", month, amount),
            date: Some(at),
            amount,
            method: PaymentMethod::Stripe,
            payment_type: None,
            status: None,
            subscription: Some(SubscriptionRef {
                id: "s-1".to_string(),
            }),
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn test_counts_and_revenue() {
        let subscriptions = vec![
            subscription("s-1", SubscriptionStatus::Active),
            subscription("s-2", SubscriptionStatus::Active),
            subscription("s-3", SubscriptionStatus::Pending),
            subscription("s-4", SubscriptionStatus::Expired),
        ];
        let payments = vec![payment(100.0, 3), payment(50.5, 1), payment(20.0, 3)];

        let stats = DashboardStats::compute(&subscriptions, 12, &payments, 3);

        assert_eq!(stats.total_subscriptions, 12);
        assert_eq!(stats.active_subscriptions, 2);
        assert_eq!(stats.total_organizations, 3);
        assert!((stats.total_revenue - 170.5).abs() < f64::EPSILON);

        let by_status: Vec<(&str, u64)> = stats
            .subscriptions_by_status
            .iter()
            .map(|s| (s.name.as_str(), s.value))
            .collect();
        assert_eq!(
            by_status,
            vec![("Active", 2), ("Pending", 1), ("Cancelled", 0), ("Expired", 1)]
        );

        assert_eq!(
            stats.revenue_by_month,
            vec![
                MonthlyRevenue {
                    month: "Mar".to_string(),
                    amount: 120.0
                },
                MonthlyRevenue {
                    month: "Jan".to_string(),
                    amount: 50.5
                },
            ]
        );
    }

    #[test]
    fn test_empty_inputs() {
        let stats = DashboardStats::compute(&[], 0, &[], 0);
        assert_eq!(stats.total_revenue, 0.0);
        assert!(stats.revenue_by_month.is_empty());
        assert_eq!(stats.subscriptions_by_status.len(), 4);
        assert!(stats.subscriptions_by_status.iter().all(|s| s.value == 0));
    }
}
