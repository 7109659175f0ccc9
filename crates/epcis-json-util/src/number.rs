use serde_json;
use std::cmp::Ordering;
use std::convert::TryFrom;
use std::fmt::Display;

/// `Number` holds possible numeric types of the JSON object model.
#[derive(Debug, Copy, Clone)]
pub enum Number {
    Unsigned(u64),
    Signed(i64),
    Float(f64),
}
use Number::*;

impl Display for Number {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Unsigned(n) => write!(f, "{}", n),
            Signed(n) => write!(f, "{}", n),
            Float(n) => write!(f, "{}", n),
        }
    }
}

impl From<&serde_json::Number> for Number {
    fn from(n: &serde_json::Number) -> Self {
        if let Some(n) = n.as_u64() {
            Unsigned(n)
        } else if let Some(n) = n.as_i64() {
            Signed(n)
        } else {
            Float(n.as_f64().unwrap())
        }
    }
}

impl From<u64> for Number {
    fn from(n: u64) -> Self {
        Self::Unsigned(n)
    }
}

impl From<i64> for Number {
    fn from(n: i64) -> Self {
        Self::Signed(n)
    }
}

impl From<f64> for Number {
    fn from(n: f64) -> Self {
        Self::Float(n)
    }
}

impl TryFrom<Number> for serde_json::Value {
    type Error = ();

    fn try_from(n: Number) -> Result<Self, Self::Error> {
        match n {
            Unsigned(n) => Ok(serde_json::Value::Number(n.into())),
            Signed(n) => Ok(serde_json::Value::Number(n.into())),
            Float(n) => match serde_json::Number::from_f64(n) {
                Some(n) => Ok(serde_json::Value::Number(n)),
                None => Err(()),
            },
        }
    }
}

impl Into<f64> for Number {
    fn into(self) -> f64 {
        match self {
            Unsigned(n) => n as f64,
            Signed(n) => n as f64,
            Float(n) => n,
        }
    }
}

impl Ord for Number {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Unsigned(lhs), Unsigned(rhs)) => lhs.cmp(rhs),
            (Unsigned(_), Signed(rhs)) if *rhs < 0 => Ordering::Greater,
            (Unsigned(lhs), Signed(rhs)) => lhs.cmp(&(*rhs as u64)),
            (Unsigned(lhs), Float(rhs)) => f64_cmp(&(*lhs as f64), rhs),

            (Signed(lhs), Unsigned(_)) if *lhs < 0 => Ordering::Less,
            (Signed(lhs), Unsigned(rhs)) => (*lhs as u64).cmp(&rhs),
            (Signed(lhs), Signed(rhs)) => lhs.cmp(rhs),
            (Signed(lhs), Float(rhs)) => f64_cmp(&(*lhs as f64), rhs),

            (Float(lhs), Unsigned(rhs)) => f64_cmp(lhs, &(*rhs as f64)),
            (Float(lhs), Signed(rhs)) => f64_cmp(lhs, &(*rhs as f64)),
            (Float(lhs), Float(rhs)) => f64_cmp(lhs, rhs),
        }
    }
}

impl PartialOrd for Number {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}
impl Eq for Number {}

impl Number {
    pub fn is_float(&self) -> bool {
        match self {
            Float(_) => true,
            _ => false,
        }
    }

    pub fn is_multiple_of(&self, d: &Self) -> bool {
        use Number::*;

        match *d {
            Unsigned(d) => match *self {
                Unsigned(n) => n % d == 0,
                Signed(n) => n % (d as i64) == 0,
                Float(n) => (n / (d as f64)).fract() == 0.0,
            },
            Signed(d) => match *self {
                Unsigned(n) => (n as i64) % d == 0,
                Signed(n) => n % d == 0,
                Float(n) => (n / (d as f64)).fract() == 0.0,
            },
            Float(d) => match *self {
                Unsigned(n) => (n as f64) % d == 0.0,
                Signed(n) => (n as f64) % d == 0.0,
                Float(n) => (n / d).fract() == 0.0,
            },
        }
    }
}

fn f64_cmp(lhs: &f64, rhs: &f64) -> Ordering {
    lhs.partial_cmp(rhs).unwrap_or_else(|| {
        if lhs.is_nan() && rhs.is_nan() {
            Ordering::Equal
        } else if lhs.is_nan() {
            Ordering::Less
        } else if rhs.is_nan() {
            Ordering::Greater
        } else {
            panic!("couldn't compare {} and {}", lhs, rhs);
        }
    })
}
