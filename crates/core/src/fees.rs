use rust_decimal::Decimal;

/// Fixed platform commission: 5% of the bid amount.
pub fn commission_rate() -> Decimal {
    Decimal::new(5, 2)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FeeSplit {
    pub platform_fee: Decimal,
    pub net_earnings: Decimal,
}

/// Splits a bid amount into platform fee and contractor net earnings.
///
/// The fee is rounded to two decimal places and the net is derived by
/// subtraction, so `platform_fee + net_earnings == amount` holds exactly.
pub fn split_amount(amount: Decimal) -> FeeSplit {
    let platform_fee = (amount * commission_rate()).round_dp(2);
    FeeSplit { platform_fee, net_earnings: amount - platform_fee }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{commission_rate, split_amount};

    #[test]
    fn five_percent_of_round_amounts() {
        let fees = split_amount(Decimal::new(1_000_000, 2)); // 10,000.00
        assert_eq!(fees.platform_fee, Decimal::new(50_000, 2)); // 500.00
        assert_eq!(fees.net_earnings, Decimal::new(950_000, 2)); // 9,500.00

        let fees = split_amount(Decimal::new(800_000, 2)); // 8,000.00
        assert_eq!(fees.platform_fee, Decimal::new(40_000, 2)); // 400.00
        assert_eq!(fees.net_earnings, Decimal::new(760_000, 2)); // 7,600.00
    }

    #[test]
    fn split_reassembles_exactly_even_when_rounded() {
        for paise in [1, 33, 999, 12_345, 333_333, 1_000_001] {
            let amount = Decimal::new(paise, 2);
            let fees = split_amount(amount);
            assert_eq!(fees.platform_fee + fees.net_earnings, amount, "amount {amount}");
            assert_eq!(fees.platform_fee, fees.platform_fee.round_dp(2));
        }
    }

    #[test]
    fn rate_is_five_percent() {
        assert_eq!(commission_rate(), Decimal::new(5, 2));
    }
}
