use rand::Rng;

/// The control shapes an application-form question can carry. A field is
/// classified exactly once per pass and dispatched on the result, instead
/// of re-probing the DOM at every branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Radio,
    MultiSelect,
    Text,
    Autocomplete,
    TextArea,
    Fieldset,
    Date,
    Unknown,
}

/// Presence flags gathered from one scan of a field's subtree.
#[derive(Debug, Clone, Copy, Default)]
pub struct ControlProbe {
    pub radio: bool,
    pub multi_select: bool,
    pub text_input: bool,
    pub autocomplete: bool,
    pub text_area: bool,
    pub fieldset: bool,
    pub date_input: bool,
}

/// Priority-ordered: the first shape present wins and the rest are ignored.
/// A narrow probe (radio) outranks the generic fieldset probe that would
/// also match it.
pub fn classify(probe: ControlProbe) -> FieldKind {
    if probe.radio {
        FieldKind::Radio
    } else if probe.multi_select {
        FieldKind::MultiSelect
    } else if probe.text_input {
        FieldKind::Text
    } else if probe.autocomplete {
        FieldKind::Autocomplete
    } else if probe.text_area {
        FieldKind::TextArea
    } else if probe.fieldset {
        FieldKind::Fieldset
    } else if probe.date_input {
        FieldKind::Date
    } else {
        FieldKind::Unknown
    }
}

/// How an option ended up selected. Carried through to logging so the bank
/// file can be audited against what actually got clicked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pick {
    Exact(usize),
    Contains(usize),
    Random(usize),
}

impl Pick {
    pub fn index(self) -> usize {
        match self {
            Pick::Exact(i) | Pick::Contains(i) | Pick::Random(i) => i,
        }
    }
}

/// Option selection for radio groups and fieldsets: exact case-insensitive
/// match, then substring containment, then a uniform random pick. Returns
/// None only for an empty option list.
pub fn pick_option(options: &[String], answer: &str, rng: &mut impl Rng) -> Option<Pick> {
    if options.is_empty() {
        return None;
    }
    let want = answer.trim().to_lowercase();
    for (i, option) in options.iter().enumerate() {
        if option.trim().to_lowercase() == want {
            return Some(Pick::Exact(i));
        }
    }
    for (i, option) in options.iter().enumerate() {
        if option.to_lowercase().contains(&want) {
            return Some(Pick::Contains(i));
        }
    }
    Some(Pick::Random(rng.gen_range(0..options.len())))
}

/// Dropdown selection: first visible text containing the answer, else the
/// second entry. Index 0 is normally the "Select an option" placeholder,
/// so the conservative non-empty fallback is position 1.
pub fn pick_dropdown_option(texts: &[String], answer: &str) -> usize {
    let want = answer.trim().to_lowercase();
    for (i, text) in texts.iter().enumerate() {
        if text.trim().to_lowercase().contains(&want) {
            return i;
        }
    }
    if texts.len() > 1 { 1 } else { 0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn opts(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn classification_priority_is_fixed() {
        let both = ControlProbe {
            radio: true,
            date_input: true,
            ..Default::default()
        };
        assert_eq!(classify(both), FieldKind::Radio);

        let fieldset_and_date = ControlProbe {
            fieldset: true,
            date_input: true,
            ..Default::default()
        };
        assert_eq!(classify(fieldset_and_date), FieldKind::Fieldset);

        assert_eq!(classify(ControlProbe::default()), FieldKind::Unknown);
    }

    #[test]
    fn exact_match_beats_substring_collision() {
        let options = opts(&["Strongly Disagree", "Disagree", "Agree", "Strongly Agree"]);
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(pick_option(&options, "Agree", &mut rng), Some(Pick::Exact(2)));
        assert_eq!(
            pick_option(&options, "disagree", &mut rng),
            Some(Pick::Exact(1))
        );
    }

    #[test]
    fn substring_match_when_no_exact() {
        let options = opts(&["Native or bilingual", "Professional working"]);
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(
            pick_option(&options, "Native", &mut rng),
            Some(Pick::Contains(0))
        );
    }

    #[test]
    fn random_fallback_is_seed_deterministic() {
        let options = opts(&["Yes", "No"]);
        let mut a = StdRng::seed_from_u64(42);
        let mut b = StdRng::seed_from_u64(42);
        let first = pick_option(&options, "Disagree", &mut a);
        let second = pick_option(&options, "Disagree", &mut b);
        assert_eq!(first, second);
        match first {
            Some(Pick::Random(i)) => assert!(i < options.len()),
            other => panic!("expected random pick, got {other:?}"),
        }
    }

    #[test]
    fn empty_option_list_yields_none() {
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(pick_option(&[], "Yes", &mut rng), None);
    }

    #[test]
    fn dropdown_falls_back_to_second_position() {
        let texts = opts(&["Select an option", "0-1 years", "2-4 years"]);
        assert_eq!(pick_dropdown_option(&texts, "2-4"), 2);
        assert_eq!(pick_dropdown_option(&texts, "nothing matches"), 1);
        assert_eq!(pick_dropdown_option(&opts(&["only"]), "zzz"), 0);
    }
}
