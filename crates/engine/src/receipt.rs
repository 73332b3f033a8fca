//! Receipt rendering.
//!
//! A pure view over a recorded transaction plus the user's receipt
//! settings. Rendering never mutates the ledger, so calling it twice for
//! the same transaction yields the same receipt.

use std::sync::LazyLock;

use regex::Regex;

use crate::{Money, settings::UserSettings, transactions::Transaction};

/// Placeholder sender when no receipt account name is configured.
const CUSTOMER_PLACEHOLDER: &str = "Keystone Customer";

/// Recognizes transfer descriptions and captures the bank and the last
/// four digits of the account.
#[allow(clippy::unwrap_used)]
static TRANSFER_DESCRIPTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)Transfer to ([^\-]+) \(Acct: \.\.\.(\d{4})\)").unwrap()
});

/// A rendered receipt, ready for display or HTML export.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Receipt {
    pub reference: String,
    pub date: String,
    pub time: String,
    pub status: String,
    /// Sender label: the configured receipt name or a placeholder.
    pub from: String,
    /// Configured receipt account number, possibly empty.
    pub from_account: String,
    /// Recipient parsed from the description, or the raw description when
    /// it is not a transfer.
    pub to: String,
    pub narration: String,
    /// Absolute transaction amount.
    pub amount: Money,
    pub fee: Money,
    /// Amount plus fee.
    pub total: Money,
}

/// Builds the receipt for `transaction` under `settings`.
pub fn render(transaction: &Transaction, settings: &UserSettings) -> Receipt {
    let from = settings
        .receipt_account_name
        .clone()
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| CUSTOMER_PLACEHOLDER.to_string());
    let from_account = settings.receipt_account_number.clone().unwrap_or_default();

    let to = match TRANSFER_DESCRIPTION.captures(&transaction.description) {
        Some(captures) => format!("{} (Acct: ...{})", captures[1].trim(), &captures[2]),
        None => transaction.description.clone(),
    };

    let narration = transaction
        .meta
        .get("narration")
        .cloned()
        .unwrap_or_default();

    let amount = transaction.amount.abs();
    let fee = transaction
        .meta
        .get("fee")
        .and_then(|raw| raw.parse::<i64>().ok())
        .map(Money::new)
        .unwrap_or(Money::ZERO);

    Receipt {
        reference: transaction.reference.clone(),
        date: transaction.date(),
        time: transaction.time(),
        status: transaction.status.as_str().to_string(),
        from,
        from_account,
        to,
        narration,
        amount,
        fee,
        total: amount + fee,
    }
}

impl Receipt {
    /// Renders the receipt as a standalone HTML document.
    pub fn to_html(&self) -> String {
        let detail = |label: &str, value: &str| {
            format!("<div class=\"receipt-detail\"><span>{label}</span><strong>{value}</strong></div>")
        };
        format!(
            concat!(
                "<html><head><meta charset=\"utf-8\"><style>{styles}</style></head><body>",
                "<div class=\"receipt-card\" role=\"document\">",
                "<div class=\"receipt-meta\">",
                "<div class=\"receipt-logo\">KS</div>",
                "<div><div class=\"receipt-header\">Keystone Bank</div>",
                "<div>Instant Transfers | NGN</div></div>",
                "<div>{date} {time}</div>",
                "</div>",
                "<div class=\"receipt-amount\">{amount}</div>",
                "<div class=\"status-pill status-{status}\">{status}</div>",
                "{reference}{from}{to}{narration}{fee}{total}",
                "<div class=\"receipt-footer\">Keystone Bank</div>",
                "</div></body></html>",
            ),
            styles = RECEIPT_STYLES,
            date = self.date,
            time = self.time,
            amount = self.amount,
            status = self.status,
            reference = detail("Transaction Ref", &self.reference),
            from = detail("From", &self.from),
            to = detail("To", &self.to),
            narration = detail("Narration", &self.narration),
            fee = detail("Service Fee", &self.fee.to_string()),
            total = detail("Total Debited", &self.total.to_string()),
        )
    }
}

const RECEIPT_STYLES: &str = "\
body{font-family:Roboto,Arial,sans-serif;color:#222;padding:18px}\
.receipt-card{max-width:720px;margin:0 auto;background:#fff;padding:20px;border-radius:8px;border:1px solid #e6e6e6}\
.receipt-meta{display:flex;justify-content:space-between;align-items:center}\
.receipt-logo{width:56px;height:56px;border-radius:8px;background:#00255B;color:#fff;display:flex;align-items:center;justify-content:center;font-weight:800}\
.receipt-header{font-size:18px;font-weight:700;margin:12px 0}\
.receipt-amount{font-size:28px;color:#00255B;font-weight:800;margin:8px 0}\
.receipt-detail{display:flex;justify-content:space-between;padding:8px 0;border-bottom:1px dashed #eee}\
.status-pill{padding:6px 10px;border-radius:12px;font-weight:700;font-size:12px}\
.status-Completed{background:#e6ffec;color:#28a745}\
.status-Pending{background:#fff6e6;color:#d97706}\
.status-Failed{background:#fdecea;color:#c0392b}\
.status-Reversed{background:#f3f6ff;color:#2b6cb0}\
.receipt-footer{text-align:center;color:#666;margin-top:14px;font-size:13px}";

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::transactions::{TransactionKind, TransactionStatus};

    fn transfer_transaction(meta: BTreeMap<String, String>) -> Transaction {
        Transaction::new(
            TransactionKind::Debit,
            Utc.with_ymd_and_hms(2025, 10, 9, 14, 30, 0).single().unwrap(),
            "Transfer to GTBank (Acct: ...6789) - Rent".to_string(),
            Money::new(-5_000_000),
            TransactionStatus::Completed,
            meta,
        )
        .unwrap()
    }

    #[test]
    fn parses_recipient_from_transfer_description() {
        let receipt = render(&transfer_transaction(BTreeMap::new()), &UserSettings::default());
        assert_eq!(receipt.to, "GTBank (Acct: ...6789)");
        assert_eq!(receipt.from, "Keystone Customer");
        assert_eq!(receipt.amount, Money::new(5_000_000));
        assert_eq!(receipt.date, "2025-10-09");
        assert_eq!(receipt.time, "14:30");
    }

    #[test]
    fn falls_back_to_description_for_other_entries() {
        let tx = Transaction::new(
            TransactionKind::Credit,
            Utc.with_ymd_and_hms(2025, 10, 8, 9, 0, 0).single().unwrap(),
            "Salary Deposit - ACME LTD".to_string(),
            Money::new(35_000_000),
            TransactionStatus::Completed,
            BTreeMap::new(),
        )
        .unwrap();

        let receipt = render(&tx, &UserSettings::default());
        assert_eq!(receipt.to, "Salary Deposit - ACME LTD");
    }

    #[test]
    fn fee_from_meta_adds_into_total() {
        let mut meta = BTreeMap::new();
        meta.insert("fee".to_string(), "5350".to_string());
        let receipt = render(&transfer_transaction(meta), &UserSettings::default());
        assert_eq!(receipt.fee, Money::new(5_350));
        assert_eq!(receipt.total, Money::new(5_005_350));
    }

    #[test]
    fn configured_receipt_fields_take_precedence() {
        let settings = UserSettings {
            receipt_account_name: Some("Ada L.".to_string()),
            receipt_account_number: Some("0011223344".to_string()),
            ..Default::default()
        };
        let receipt = render(&transfer_transaction(BTreeMap::new()), &settings);
        assert_eq!(receipt.from, "Ada L.");
        assert_eq!(receipt.from_account, "0011223344");
    }

    #[test]
    fn rendering_is_idempotent() {
        let tx = transfer_transaction(BTreeMap::new());
        let settings = UserSettings::default();
        assert_eq!(render(&tx, &settings), render(&tx, &settings));

        let html = render(&tx, &settings).to_html();
        assert!(html.contains("GTBank (Acct: ...6789)"));
        assert!(html.contains("status-Completed"));
    }
}
