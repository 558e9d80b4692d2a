use rand::{thread_rng, Rng};

/// Six-digit numeric one-time code, never starting with zero.
pub fn generate_otp_code() -> String {
    thread_rng().gen_range(100_000..=999_999u32).to_string()
}
