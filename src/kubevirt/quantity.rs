//! Memory quantity parsing

const SUFFIXES: [(&str, u64); 12] = [
    ("Ki", 1 << 10),
    ("Mi", 1 << 20),
    ("Gi", 1 << 30),
    ("Ti", 1 << 40),
    ("Pi", 1 << 50),
    ("Ei", 1 << 60),
    ("k", 1_000),
    ("M", 1_000_000),
    ("G", 1_000_000_000),
    ("T", 1_000_000_000_000),
    ("P", 1_000_000_000_000_000),
    ("E", 1_000_000_000_000_000_000),
];

/// Bytes in a Kubernetes memory quantity such as "512Mi", "1.5Gi" or "2G"
pub fn parse_bytes(quantity: &str) -> Option<u64> {
    let quantity = quantity.trim();
    let (number, multiplier) = SUFFIXES
        .iter()
        .find(|(suffix, _)| quantity.ends_with(suffix))
        .map(|(suffix, m)| (&quantity[..quantity.len() - suffix.len()], *m))
        .unwrap_or((quantity, 1));

    if let Ok(n) = number.parse::<u64>() {
        return n.checked_mul(multiplier);
    }
    let n = number.parse::<f64>().ok().filter(|n| *n >= 0.0)?;
    Some((n * multiplier as f64) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bytes() {
        assert_eq!(parse_bytes("4Gi"), Some(4 << 30));
        assert_eq!(parse_bytes("512Mi"), Some(512 << 20));
        assert_eq!(parse_bytes("1.5Gi"), Some(3 << 29));
        assert_eq!(parse_bytes("2G"), Some(2_000_000_000));
        assert_eq!(parse_bytes("1024"), Some(1024));
    }

    #[test]
    fn test_parse_bytes_rejects_garbage() {
        assert_eq!(parse_bytes(""), None);
        assert_eq!(parse_bytes("lots"), None);
        assert_eq!(parse_bytes("-1Gi"), None);
    }
}
