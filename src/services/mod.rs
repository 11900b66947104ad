pub mod ledger;
pub mod live;
pub mod profiles;
pub mod rides;
