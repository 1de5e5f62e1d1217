//! Facility catalog printed on room documents.

/// Facilities listed for every room.
pub const DEFAULT_FACILITIES: [&str; 12] = [
    "King sized bed",
    "Air Conditioning",
    "Sitting area",
    "Large en-suite shower room",
    "Internet TV",
    "WiFi",
    "Nespresso System",
    "E-Concierge",
    "All-night checkin",
    "Luxury Amenities",
    "Temple Spa toiletries",
    "Towels and linen",
];

/// The default catalog as owned strings.
pub fn default_facilities() -> Vec<String> {
    DEFAULT_FACILITIES.iter().map(|f| f.to_string()).collect()
}

/// Split a list into two columns. The first column takes the extra item.
pub fn split_facilities<T>(facilities: &[T]) -> (&[T], &[T]) {
    let mid = facilities.len() / 2 + facilities.len() % 2;
    facilities.split_at(mid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_catalog_splits_evenly() {
        let facilities = default_facilities();
        let (left, right) = split_facilities(&facilities);
        assert_eq!(left.len(), 6);
        assert_eq!(right.len(), 6);
        assert_eq!(left[0], "King sized bed");
        assert_eq!(right[0], "Nespresso System");
    }

    #[test]
    fn test_odd_count_puts_extra_item_first() {
        let items = ["a", "b", "c", "d", "e"];
        let (left, right) = split_facilities(&items);
        assert_eq!(left, &["a", "b", "c"]);
        assert_eq!(right, &["d", "e"]);
    }

    #[test]
    fn test_small_lists() {
        let empty: [&str; 0] = [];
        assert_eq!(split_facilities(&empty), (&empty[..], &empty[..]));

        let one = ["a"];
        let (left, right) = split_facilities(&one);
        assert_eq!(left, &["a"]);
        assert!(right.is_empty());
    }
}
