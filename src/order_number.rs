use uuid::Uuid;

/// Length of the human-shareable order number.
pub const ORDER_NUMBER_LEN: usize = 8;

/// Draws a fresh order-number candidate: short, uppercase, random.
///
/// Uniqueness is enforced by the `orders.order_number` constraint; callers
/// retry with a new candidate on conflict.
pub fn candidate() -> String {
    let token = Uuid::new_v4().simple().to_string();
    token[..ORDER_NUMBER_LEN].to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidates_are_short_and_uppercase() {
        let number = candidate();
        assert_eq!(number.len(), ORDER_NUMBER_LEN);
        assert!(
            number
                .chars()
                .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase())
        );
    }

    #[test]
    fn candidates_differ_across_draws() {
        assert_ne!(candidate(), candidate());
    }
}
