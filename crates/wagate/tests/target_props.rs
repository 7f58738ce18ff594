// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Property tests for recipient address normalization.

use proptest::prelude::*;

use wagate::Target;

proptest! {
    #[test]
    fn every_phone_input_gets_a_wire_suffix(raw in "[0-9 +()\\-]{1,24}") {
        let target = Target::from_phone(&raw);
        prop_assert!(
            target.as_str().ends_with("@s.whatsapp.net")
                || target.as_str().ends_with("@g.us")
        );
    }

    #[test]
    fn short_numbers_become_user_targets_with_country_code(digits in "[0-9]{1,15}") {
        let target = Target::from_phone(&digits);
        prop_assert!(target.as_str().ends_with("@s.whatsapp.net"));
        prop_assert!(!target.is_group());

        let local = target.as_str().trim_end_matches("@s.whatsapp.net");
        prop_assert!(local.starts_with("62"));
        prop_assert!(local.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn local_prefix_is_rewritten_to_country_form(rest in "[0-9]{1,10}") {
        let target = Target::from_phone(&format!("08{rest}"));
        prop_assert!(target.as_str().starts_with("628"));
    }

    #[test]
    fn formatting_noise_never_changes_the_digits(digits in "[1-9][0-9]{8,13}") {
        let plain = Target::from_phone(&digits);
        let spaced = Target::from_phone(&format!("+{} {}", &digits[..3], &digits[3..]));
        prop_assert_eq!(plain, spaced);
    }

    #[test]
    fn oversized_numbers_fall_through_to_group_form(digits in "[0-9]{16,24}") {
        let target = Target::from_phone(&digits);
        prop_assert!(target.is_group());
    }
}
