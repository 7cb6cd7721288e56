//! Stock lot vocabulary and merge-on-approve matching

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::invoice::invoice_matches;

/// Lifecycle state of a stock lot.
///
/// `pending` moves to `approved` or `rejected` exactly once; approved lots
/// stay editable but never revert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LotStatus {
    Pending,
    Approved,
    Rejected,
}

impl LotStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LotStatus::Pending => "pending",
            LotStatus::Approved => "approved",
            LotStatus::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(LotStatus::Pending),
            "approved" => Some(LotStatus::Approved),
            "rejected" => Some(LotStatus::Rejected),
            _ => None,
        }
    }
}

/// Candidate row for merge-on-approve matching.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeCandidate {
    pub lot_id: Uuid,
    pub invoice_number: String,
    pub invoice_key: String,
    pub created_at: DateTime<Utc>,
}

/// Pick the approved lot a pending lot should fold into: same medicine is
/// assumed (callers pre-filter), the invoice must match in raw or normalized
/// form. The newest candidate wins when several match.
pub fn find_merge_target(candidates: &[MergeCandidate], invoice: &str) -> Option<Uuid> {
    candidates
        .iter()
        .filter(|c| invoice_matches(&c.invoice_number, &c.invoice_key, invoice))
        .max_by_key(|c| c.created_at)
        .map(|c| c.lot_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invoice::normalize_invoice;
    use chrono::TimeZone;

    fn candidate(raw: &str, ts: i64) -> MergeCandidate {
        MergeCandidate {
            lot_id: Uuid::new_v4(),
            invoice_number: raw.to_string(),
            invoice_key: normalize_invoice(raw),
            created_at: Utc.timestamp_opt(ts, 0).unwrap(),
        }
    }

    #[test]
    fn test_status_round_trip() {
        for s in [LotStatus::Pending, LotStatus::Approved, LotStatus::Rejected] {
            assert_eq!(LotStatus::parse(s.as_str()), Some(s));
        }
        assert_eq!(LotStatus::parse("cancelled"), None);
    }

    #[test]
    fn test_merge_target_matches_normalized() {
        let c = candidate("inv-7", 100);
        let id = c.lot_id;
        assert_eq!(find_merge_target(&[c], "INV-000007"), Some(id));
    }

    #[test]
    fn test_merge_target_newest_wins() {
        let older = candidate("inv-7", 100);
        let newer = candidate("INV-000007", 200);
        let expected = newer.lot_id;
        assert_eq!(find_merge_target(&[older, newer], "inv-7"), Some(expected));
    }

    #[test]
    fn test_merge_target_no_match() {
        let c = candidate("inv-7", 100);
        assert_eq!(find_merge_target(&[c], "inv-8"), None);
        assert_eq!(find_merge_target(&[], "inv-7"), None);
    }

    #[test]
    fn test_merge_target_blank_invoice_never_matches() {
        let c = candidate("inv-7", 100);
        assert_eq!(find_merge_target(&[c], ""), None);
    }
}
