//! Membership lifecycle.
//!
//! A member has exactly two transitions:
//! - payment success: status becomes `active` and `last_payment_month` the current month
//! - monthly guard: status becomes `inactive` when `last_payment_month` is not the current month

use chrono::{DateTime, FixedOffset};

use crate::error::Result;
use crate::members;
use crate::types::{Member, MemberStatus, MembershipMonth, Role};
use crate::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusChange {
    pub status: MemberStatus,
    pub last_payment_month: Option<MembershipMonth>,
    /// Skip the write if the member has meanwhile paid for this month
    pub unless_paid_for: Option<MembershipMonth>,
}

impl StatusChange {
    /// Applies whatever the member's prior status was
    pub fn payment_received(month: MembershipMonth) -> Self {
        Self {
            status: MemberStatus::Active,
            last_payment_month: Some(month),
            unless_paid_for: None,
        }
    }

    /// Deactivation for not paying `month`; leaves `last_payment_month` alone
    pub fn lapsed(month: MembershipMonth) -> Self {
        Self {
            status: MemberStatus::Inactive,
            last_payment_month: None,
            unless_paid_for: Some(month),
        }
    }
}

/// Guard decision for one member
pub fn guard_check(member: &Member, month: MembershipMonth) -> Option<StatusChange> {
    if member.role != Role::Member || member.has_paid_for(month) {
        None
    } else {
        Some(StatusChange::lapsed(month))
    }
}

pub fn members_to_deactivate(members: &[Member], month: MembershipMonth) -> Vec<&Member> {
    members
        .iter()
        .filter(|m| guard_check(m, month).is_some())
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardReport {
    pub month: MembershipMonth,
    pub deactivated: usize,
}

/// Monthly guard: deactivate every member who has not paid for the month of `now`
pub async fn run_membership_guard(
    state: &AppState,
    now: DateTime<FixedOffset>,
) -> Result<GuardReport> {
    let month = MembershipMonth::of(&now);
    let table_name = &state.settings.table_name;

    let roster = members::list_by_role(&state.dynamo_client, table_name, Role::Member).await?;
    let lapsed: Vec<String> = members_to_deactivate(&roster, month)
        .into_iter()
        .map(|m| m.user_id.clone())
        .collect();

    let deactivated = if lapsed.is_empty() {
        0
    } else {
        members::apply_status_batch(
            &state.dynamo_client,
            table_name,
            &lapsed,
            &StatusChange::lapsed(month),
        )
        .await?
    };

    tracing::info!("Auto-deactivated {} members for {}", deactivated, month);

    Ok(GuardReport { month, deactivated })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(id: &str, role: Role, status: MemberStatus, paid: Option<(i32, u32)>) -> Member {
        Member {
            user_id: id.to_string(),
            name: id.to_string(),
            email: None,
            phone: None,
            membership_id: None,
            role,
            status,
            last_payment_month: paid.and_then(|(y, m)| MembershipMonth::new(y, m)),
            push_token: None,
            join_date: None,
            total_paid: 0.0,
        }
    }

    #[test]
    fn test_payment_always_activates() {
        let month = MembershipMonth::new(2026, 10).unwrap();
        let change = StatusChange::payment_received(month);
        assert_eq!(change.status, MemberStatus::Active);
        assert_eq!(change.last_payment_month, Some(month));
        // no precondition on the prior status or month
        assert_eq!(change.unless_paid_for, None);
    }

    #[test]
    fn test_paid_member_is_never_deactivated() {
        let month = MembershipMonth::new(2026, 10).unwrap();
        for status in [MemberStatus::Active, MemberStatus::Inactive] {
            let m = member("u", Role::Member, status, Some((2026, 10)));
            assert_eq!(guard_check(&m, month), None);
        }
    }

    #[test]
    fn test_unpaid_members_lapse() {
        let month = MembershipMonth::new(2026, 10).unwrap();
        let stale = member("stale", Role::Member, MemberStatus::Active, Some((2026, 9)));
        let never = member("never", Role::Member, MemberStatus::Active, None);
        // a payment dated in a later month is still not this month's payment
        let ahead = member("ahead", Role::Member, MemberStatus::Active, Some((2026, 11)));

        for m in [&stale, &never, &ahead] {
            assert_eq!(guard_check(m, month), Some(StatusChange::lapsed(month)));
        }
    }

    #[test]
    fn test_lapse_keeps_last_payment_month_and_guards_the_month() {
        let month = MembershipMonth::new(2026, 10).unwrap();
        let change = StatusChange::lapsed(month);
        assert_eq!(change.status, MemberStatus::Inactive);
        assert_eq!(change.last_payment_month, None);
        assert_eq!(change.unless_paid_for, Some(month));
    }

    #[test]
    fn test_admins_are_left_alone() {
        let month = MembershipMonth::new(2026, 10).unwrap();
        let roster = vec![
            member("admin", Role::Admin, MemberStatus::Active, None),
            member("paid", Role::Member, MemberStatus::Active, Some((2026, 10))),
            member("late", Role::Member, MemberStatus::Inactive, Some((2026, 7))),
        ];

        let ids: Vec<&str> = members_to_deactivate(&roster, month)
            .iter()
            .map(|m| m.user_id.as_str())
            .collect();
        assert_eq!(ids, vec!["late"]);
    }
}
