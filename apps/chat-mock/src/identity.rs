use std::sync::{Mutex, PoisonError};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub const ASSISTANT_SID_PREFIX: &str = "UA";
pub const PHONE_NUMBER_SID_PREFIX: &str = "PN";

/// Source of the fake values the platform would normally assign.
pub trait IdentitySynthesizer: Send + Sync {
    /// 32 lowercase hex characters, shaped like an md5 digest.
    fn md5(&self) -> String;
    /// 15 digits with a valid Luhn check digit.
    fn imei(&self) -> String;
    /// E.164 formatted mobile number.
    fn cell_phone(&self) -> String;
}

#[must_use]
pub fn assistant_sid(hash: &str) -> String {
    format!("{ASSISTANT_SID_PREFIX}{hash}")
}

#[must_use]
pub fn phone_number_sid(hash: &str) -> String {
    format!("{PHONE_NUMBER_SID_PREFIX}{hash}")
}

#[must_use]
pub fn assistant_unique_name(assistant_sid: &str, imei: &str) -> String {
    format!("{assistant_sid}-{imei}")
}

pub struct RandomIdentitySynthesizer {
    rng: Mutex<StdRng>,
}

impl RandomIdentitySynthesizer {
    #[must_use]
    pub fn from_os_rng() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    #[must_use]
    pub fn from_seed(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self::seeded(seed),
            None => Self::from_os_rng(),
        }
    }

    fn with_rng<T>(&self, draw: impl FnOnce(&mut StdRng) -> T) -> T {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        draw(&mut rng)
    }
}

impl IdentitySynthesizer for RandomIdentitySynthesizer {
    fn md5(&self) -> String {
        let bytes: [u8; 16] = self.with_rng(|rng| rng.random());
        hex::encode(bytes)
    }

    fn imei(&self) -> String {
        let body = self.with_rng(|rng| random_digits(rng, 14));
        let check = luhn_check_digit(&body);
        format!("{body}{check}")
    }

    fn cell_phone(&self) -> String {
        // NANP: area code and exchange never start with 0 or 1.
        self.with_rng(|rng| {
            let area = rng.random_range(2..=9);
            let area_rest = random_digits(rng, 2);
            let exchange = rng.random_range(2..=9);
            let exchange_rest = random_digits(rng, 2);
            let line = random_digits(rng, 4);
            format!("+1{area}{area_rest}{exchange}{exchange_rest}{line}")
        })
    }
}

fn random_digits(rng: &mut StdRng, count: usize) -> String {
    (0..count)
        .map(|_| char::from(b'0' + rng.random_range(0..10u8)))
        .collect()
}

fn luhn_check_digit(digits: &str) -> u32 {
    let sum: u32 = digits
        .chars()
        .rev()
        .filter_map(|ch| ch.to_digit(10))
        .enumerate()
        .map(|(index, digit)| {
            if index % 2 == 0 {
                let doubled = digit * 2;
                if doubled > 9 { doubled - 9 } else { doubled }
            } else {
                digit
            }
        })
        .sum();
    (10 - sum % 10) % 10
}
