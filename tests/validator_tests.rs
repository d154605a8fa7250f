/// Unit tests for the field validators
/// Tests CPF checksums, email shape, phone digit counts and CEP formatting
use enrollment_form::age::compute_age;
use enrollment_form::validators::{
    format_postal_code, validate_cpf, validate_email, validate_phone, validate_postal_code,
};

#[cfg(test)]
mod cpf_validation_tests {
    use super::*;

    #[test]
    fn test_valid_cpfs() {
        assert!(validate_cpf("52998224725"));
        assert!(validate_cpf("529.982.247-25"));
        assert!(validate_cpf("111.444.777-35"));
        assert!(validate_cpf(" 111 444 777 35 "));
    }

    #[test]
    fn test_flipped_check_digits() {
        assert!(!validate_cpf("52998224735")); // first check digit
        assert!(!validate_cpf("52998224726")); // second check digit
        assert!(!validate_cpf("11144477734"));
    }

    #[test]
    fn test_repeated_digits_rejected() {
        for d in 0..=9 {
            let cpf = d.to_string().repeat(11);
            assert!(!validate_cpf(&cpf), "{} should be rejected", cpf);
        }
    }

    #[test]
    fn test_wrong_length() {
        assert!(!validate_cpf(""));
        assert!(!validate_cpf("5299822472"));
        assert!(!validate_cpf("529982247250"));
        assert!(!validate_cpf("abc.def.ghi-jk"));
    }
}

#[cfg(test)]
mod email_validation_tests {
    use super::*;

    #[test]
    fn test_valid_emails() {
        assert!(validate_email("a@b.com"));
        assert!(validate_email("user@example.com"));
        assert!(validate_email("User.Name+tag@Example.COM.br"));
    }

    #[test]
    fn test_invalid_emails() {
        assert!(!validate_email(""));
        assert!(!validate_email("a@b"));
        assert!(!validate_email("@example.com"));
        assert!(!validate_email("user@"));
        assert!(!validate_email("user @example.com"));
        assert!(!validate_email("user@exam ple.com"));
        assert!(!validate_email("user@@example.com"));
    }
}

#[cfg(test)]
mod phone_validation_tests {
    use super::*;

    #[test]
    fn test_accepted_digit_counts() {
        assert!(validate_phone("1133334444")); // landline, 10 digits
        assert!(validate_phone("11987654321")); // mobile, 11 digits
        assert!(validate_phone("(11) 98765-4321"));
        assert!(validate_phone("(11) 3333-4444"));
    }

    #[test]
    fn test_rejected_digit_counts() {
        assert!(!validate_phone(""));
        assert!(!validate_phone("987654321"));
        assert!(!validate_phone("+55 11 98765-4321")); // 13 digits with country code
        assert!(!validate_phone("phone"));
    }
}

#[cfg(test)]
mod postal_code_tests {
    use super::*;

    #[test]
    fn test_format_postal_code() {
        assert_eq!(format_postal_code("01310930"), "01310-930");
        assert_eq!(format_postal_code("0131"), "0131");
        assert_eq!(format_postal_code("01310-930"), "01310-930");
        assert_eq!(format_postal_code("01.310-930"), "01310-930");
    }

    #[test]
    fn test_validate_postal_code() {
        assert!(validate_postal_code("01310-930"));
        assert!(validate_postal_code("00000000"));
        assert!(!validate_postal_code("0131"));
        assert!(!validate_postal_code(""));
    }
}

#[cfg(test)]
mod age_tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_age_one_day_before_anniversary() {
        let birth = NaiveDate::from_ymd_opt(2010, 6, 15).unwrap();
        assert_eq!(compute_age(birth, NaiveDate::from_ymd_opt(2024, 6, 14).unwrap()), 13);
        assert_eq!(compute_age(birth, NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()), 14);
    }
}
