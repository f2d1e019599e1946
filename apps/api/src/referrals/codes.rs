use rand::{distr::Alphanumeric, Rng};

pub const REFERRAL_CODE_LEN: usize = 8;

/// Random upper-case alphanumeric code. Uniqueness is enforced by the store.
pub fn generate_referral_code() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(REFERRAL_CODE_LEN)
        .map(char::from)
        .collect::<String>()
        .to_uppercase()
}
