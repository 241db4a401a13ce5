/// Semantic DeFi operation behind a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Deposit,
    Borrow,
    Repay,
    Redeem,
    Liquidation,
    Other,
}

const DEPOSIT_FUNCS: &[&str] = &["deposit", "mint", "supply", "depositunderlying"];
const BORROW_FUNCS: &[&str] = &["borrow"];
const REPAY_FUNCS: &[&str] = &["repay", "repayborrow"];
const REDEEM_FUNCS: &[&str] = &["redeem", "redeemunderlying", "withdraw"];
const LIQUIDATION_FUNCS: &[&str] = &["liquidationcall", "liquidate"];

/// Lookup precedence. The sets are disjoint today; if one ever gains a name
/// another already has, the earlier entry wins.
const ACTION_TABLE: [(Action, &[&str]); 5] = [
    (Action::Deposit, DEPOSIT_FUNCS),
    (Action::Borrow, BORROW_FUNCS),
    (Action::Repay, REPAY_FUNCS),
    (Action::Redeem, REDEEM_FUNCS),
    (Action::Liquidation, LIQUIDATION_FUNCS),
];

/// Map a function name to its action by exact, case-insensitive membership.
///
/// Etherscan reports full signatures (`repayBorrow(uint256 repayAmount)`),
/// which match nothing unless `strip_signatures` reduces them to the trimmed
/// name before `(`. Missing names are `Other`.
pub fn classify(function_name: Option<&str>, strip_signatures: bool) -> Action {
    let raw = function_name.unwrap_or_default();
    let name = if strip_signatures {
        raw.split('(').next().unwrap_or_default().trim()
    } else {
        raw
    }
    .to_lowercase();

    ACTION_TABLE
        .iter()
        .find(|(_, names)| names.contains(&name.as_str()))
        .map_or(Action::Other, |(action, _)| *action)
}
