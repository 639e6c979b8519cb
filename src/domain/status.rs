//! Transaction lifecycle state machine.
//!
//! The transition table here is the single authority on which status changes
//! are legal. Persistence layers must never write a status that did not come
//! out of [`TransactionStatus::apply`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    QuoteCreated,
    PendingPayment,
    PaymentReceived,
    PendingApproval,
    Processing,
    PayoutInitiated,
    PayoutCompleted,
    Delivered,
    Cancelled,
    Failed,
    ManuallyRejected,
    Refunded,
}

/// Events that drive the state machine. Each maps to exactly one row of the
/// transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionEvent {
    PaymentIntentCreated,
    PaymentConfirmed,
    Approved,
    Rejected,
    PayoutInitiated,
    PayoutConfirmed,
    DeliveryConfirmed,
    Failed,
    Cancelled,
    RefundConfirmed,
}

/// A transition attempted from a state the table does not allow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidTransition {
    pub current: TransactionStatus,
    pub event: TransactionEvent,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::QuoteCreated => "quote_created",
            Self::PendingPayment => "pending_payment",
            Self::PaymentReceived => "payment_received",
            Self::PendingApproval => "pending_approval",
            Self::Processing => "processing",
            Self::PayoutInitiated => "payout_initiated",
            Self::PayoutCompleted => "payout_completed",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
            Self::ManuallyRejected => "manually_rejected",
            Self::Refunded => "refunded",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Delivered | Self::Cancelled | Self::Failed | Self::ManuallyRejected | Self::Refunded
        )
    }

    /// Applies an event, yielding the resulting status or an
    /// [`InvalidTransition`] if the table has no row for (self, event).
    ///
    /// Note: a confirmed payment lands directly in `PendingApproval`; the
    /// `PaymentReceived` hop is collapsed into the same transition because no
    /// operation ever observes a transaction parked between the two.
    pub fn apply(self, event: TransactionEvent) -> Result<TransactionStatus, InvalidTransition> {
        use TransactionEvent as E;
        use TransactionStatus as S;

        let next = match (self, event) {
            (S::QuoteCreated, E::PaymentIntentCreated) => S::PendingPayment,
            (S::PendingPayment, E::PaymentConfirmed) => S::PendingApproval,
            (S::PendingApproval, E::Approved) => S::Processing,
            (S::PendingApproval, E::Rejected) => S::ManuallyRejected,
            (S::Processing, E::PayoutInitiated) => S::PayoutInitiated,
            (S::PayoutInitiated, E::PayoutConfirmed) => S::PayoutCompleted,
            (S::PayoutCompleted, E::DeliveryConfirmed) => S::Delivered,
            (S::QuoteCreated | S::PendingPayment, E::Cancelled) => S::Cancelled,
            (S::Failed | S::ManuallyRejected, E::RefundConfirmed) => S::Refunded,
            (current, E::Failed) if !current.is_terminal() => S::Failed,
            (current, event) => return Err(InvalidTransition { current, event }),
        };

        Ok(next)
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "quote_created" => Ok(Self::QuoteCreated),
            "pending_payment" => Ok(Self::PendingPayment),
            "payment_received" => Ok(Self::PaymentReceived),
            "pending_approval" => Ok(Self::PendingApproval),
            "processing" => Ok(Self::Processing),
            "payout_initiated" => Ok(Self::PayoutInitiated),
            "payout_completed" => Ok(Self::PayoutCompleted),
            "delivered" => Ok(Self::Delivered),
            "cancelled" => Ok(Self::Cancelled),
            "failed" => Ok(Self::Failed),
            "manually_rejected" => Ok(Self::ManuallyRejected),
            "refunded" => Ok(Self::Refunded),
            other => Err(format!("unknown transaction status: {other}")),
        }
    }
}

impl TransactionEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PaymentIntentCreated => "payment_intent_created",
            Self::PaymentConfirmed => "payment_confirmed",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::PayoutInitiated => "payout_initiated",
            Self::PayoutConfirmed => "payout_confirmed",
            Self::DeliveryConfirmed => "delivery_confirmed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
            Self::RefundConfirmed => "refund_confirmed",
        }
    }
}

impl fmt::Display for TransactionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::TransactionEvent as E;
    use super::TransactionStatus as S;
    use super::*;

    const ALL_STATUSES: [S; 12] = [
        S::QuoteCreated,
        S::PendingPayment,
        S::PaymentReceived,
        S::PendingApproval,
        S::Processing,
        S::PayoutInitiated,
        S::PayoutCompleted,
        S::Delivered,
        S::Cancelled,
        S::Failed,
        S::ManuallyRejected,
        S::Refunded,
    ];

    #[test]
    fn happy_path_walks_the_table() {
        let mut status = S::QuoteCreated;
        for (event, expected) in [
            (E::PaymentIntentCreated, S::PendingPayment),
            (E::PaymentConfirmed, S::PendingApproval),
            (E::Approved, S::Processing),
            (E::PayoutInitiated, S::PayoutInitiated),
            (E::PayoutConfirmed, S::PayoutCompleted),
            (E::DeliveryConfirmed, S::Delivered),
        ] {
            status = status.apply(event).expect("legal transition");
            assert_eq!(status, expected);
        }
        assert!(status.is_terminal());
    }

    #[test]
    fn approve_only_from_pending_approval() {
        for status in ALL_STATUSES {
            let result = status.apply(E::Approved);
            if status == S::PendingApproval {
                assert_eq!(result, Ok(S::Processing));
            } else {
                assert_eq!(
                    result,
                    Err(InvalidTransition {
                        current: status,
                        event: E::Approved
                    })
                );
            }
        }
    }

    #[test]
    fn reject_only_from_pending_approval() {
        for status in ALL_STATUSES {
            let result = status.apply(E::Rejected);
            if status == S::PendingApproval {
                assert_eq!(result, Ok(S::ManuallyRejected));
            } else {
                assert!(result.is_err());
            }
        }
    }

    #[test]
    fn cancel_only_before_payment_received() {
        assert_eq!(S::QuoteCreated.apply(E::Cancelled), Ok(S::Cancelled));
        assert_eq!(S::PendingPayment.apply(E::Cancelled), Ok(S::Cancelled));
        for status in ALL_STATUSES {
            if !matches!(status, S::QuoteCreated | S::PendingPayment) {
                assert!(status.apply(E::Cancelled).is_err(), "cancel allowed from {status}");
            }
        }
    }

    #[test]
    fn failure_allowed_from_any_non_terminal_state() {
        for status in ALL_STATUSES {
            let result = status.apply(E::Failed);
            if status.is_terminal() {
                assert!(result.is_err(), "failure allowed from terminal {status}");
            } else {
                assert_eq!(result, Ok(S::Failed));
            }
        }
    }

    #[test]
    fn refund_only_from_failed_or_rejected() {
        assert_eq!(S::Failed.apply(E::RefundConfirmed), Ok(S::Refunded));
        assert_eq!(S::ManuallyRejected.apply(E::RefundConfirmed), Ok(S::Refunded));
        for status in ALL_STATUSES {
            if !matches!(status, S::Failed | S::ManuallyRejected) {
                assert!(status.apply(E::RefundConfirmed).is_err());
            }
        }
    }

    #[test]
    fn terminal_states_accept_no_events() {
        const ALL_EVENTS: [E; 10] = [
            E::PaymentIntentCreated,
            E::PaymentConfirmed,
            E::Approved,
            E::Rejected,
            E::PayoutInitiated,
            E::PayoutConfirmed,
            E::DeliveryConfirmed,
            E::Failed,
            E::Cancelled,
            E::RefundConfirmed,
        ];
        for status in [S::Delivered, S::Cancelled, S::Refunded] {
            for event in ALL_EVENTS {
                assert!(status.apply(event).is_err(), "{status} accepted {event}");
            }
        }
    }

    #[test]
    fn replayed_payment_confirmation_is_rejected() {
        let status = S::PendingPayment.apply(E::PaymentConfirmed).unwrap();
        assert_eq!(status, S::PendingApproval);
        assert_eq!(
            status.apply(E::PaymentConfirmed),
            Err(InvalidTransition {
                current: S::PendingApproval,
                event: E::PaymentConfirmed
            })
        );
    }

    #[test]
    fn status_strings_round_trip() {
        for status in ALL_STATUSES {
            assert_eq!(status.as_str().parse::<S>(), Ok(status));
        }
        assert!("approved".parse::<S>().is_err());
    }
}
