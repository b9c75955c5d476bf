use proptest::collection::vec;
use proptest::prelude::*;
use proptest::test_runner::{FileFailurePersistence, TestCaseError, TestCaseResult};
use store_enhancer::enhance::fields::parse_float;
use store_enhancer::{Page, PageEnhancer};

const ENHANCER_PROPTEST_REGRESSION_FILE: &str =
    "tests/proptest-regressions/enhancer_property_test.txt";
const DEFAULT_ENHANCER_PROPTEST_CASES: u32 = 64;

const SEARCH_HTML: &str = r#"
<body>
  <form id="search-form" action="/products/search" method="get">
    <input id="q" name="search">
  </form>
</body>
"#;

const PRICE_HTML: &str = r#"<body><input id="price" type="number" step="0.01" name="price"></body>"#;

fn enhancer_proptest_cases() -> u32 {
    std::env::var("STORE_ENHANCER_PROPTEST_CASES")
        .ok()
        .and_then(|raw| raw.parse::<u32>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(DEFAULT_ENHANCER_PROPTEST_CASES)
}

fn fail(err: store_enhancer::Error) -> TestCaseError {
    TestCaseError::fail(format!("{err:?}"))
}

fn search_term_strategy() -> BoxedStrategy<String> {
    vec(
        prop_oneof![
            Just('a'),
            Just('b'),
            Just('z'),
            Just('7'),
            Just(' '),
            Just('é'),
            Just('ß'),
        ],
        0..=4,
    )
    .prop_map(|chars| chars.into_iter().collect())
    .boxed()
}

fn keystroke_strategy() -> BoxedStrategy<Vec<(String, i64)>> {
    vec((search_term_strategy(), 0_i64..2_000), 1..=12).boxed()
}

fn required_value_strategy() -> BoxedStrategy<String> {
    prop_oneof![
        Just(String::new()),
        Just("   ".to_string()),
        "[a-z]{1,6}",
        " [A-Z][a-z]{0,4} ",
    ]
    .boxed()
}

fn expected_submissions(keystrokes: &[(String, i64)]) -> Vec<String> {
    keystrokes
        .iter()
        .enumerate()
        .filter(|(idx, (_, pause))| *idx + 1 == keystrokes.len() || *pause >= 1000)
        .map(|(_, (term, _))| term.clone())
        .filter(|term| {
            let length = term.chars().count();
            length == 0 || length >= 2
        })
        .collect()
}

fn assert_debounced_search(keystrokes: &[(String, i64)]) -> TestCaseResult {
    let mut page = Page::from_html_with_url("http://shop.test/", SEARCH_HTML).map_err(fail)?;
    PageEnhancer::default().attach(&mut page).map_err(fail)?;

    for (term, pause) in keystrokes {
        page.type_text("#q", term).map_err(fail)?;
        page.advance_time(*pause).map_err(fail)?;
    }
    page.advance_time(1000).map_err(fail)?;

    let submitted = page
        .take_navigations()
        .into_iter()
        .map(|navigation| {
            navigation
                .url
                .query_pairs()
                .find(|(name, _)| name == "search")
                .map(|(_, value)| value.into_owned())
                .unwrap_or_default()
        })
        .collect::<Vec<_>>();
    prop_assert_eq!(submitted, expected_submissions(keystrokes));
    prop_assert!(page.pending_timers().is_empty());
    Ok(())
}

fn assert_required_fields(values: &[String]) -> TestCaseResult {
    let fields = values
        .iter()
        .enumerate()
        .map(|(idx, _)| format!(r#"<input id="f{idx}" name="f{idx}" required>"#))
        .collect::<String>();
    let html = format!(r#"<body><form id="form" action="/save" method="post">{fields}</form></body>"#);
    let mut page = Page::from_html(&html).map_err(fail)?;
    PageEnhancer::default().attach(&mut page).map_err(fail)?;

    for (idx, value) in values.iter().enumerate() {
        page.type_text(&format!("#f{idx}"), value).map_err(fail)?;
    }
    page.submit("#form").map_err(fail)?;

    let blank = values
        .iter()
        .map(|value| value.trim().is_empty())
        .collect::<Vec<_>>();
    let first_blank = blank.iter().position(|is_blank| *is_blank);

    prop_assert_eq!(page.navigations().len(), usize::from(first_blank.is_none()));
    for (idx, is_blank) in blank.iter().enumerate() {
        let selector = format!("#f{idx}");
        let field = page.select_one(&selector).map_err(fail)?;
        prop_assert_eq!(
            page.dom().has_class(field, "is-invalid"),
            *is_blank,
            "field {} with value {:?}",
            idx,
            values[idx]
        );
    }
    if let Some(idx) = first_blank {
        let expected = page.select_one(&format!("#f{idx}")).map_err(fail)?;
        prop_assert_eq!(page.dom().active_element(), Some(expected));
    }
    Ok(())
}

fn assert_price_clamp(typed: &str) -> TestCaseResult {
    let mut page = Page::from_html(PRICE_HTML).map_err(fail)?;
    PageEnhancer::default().attach(&mut page).map_err(fail)?;
    page.type_text("#price", typed).map_err(fail)?;

    let parsed = parse_float(typed);
    let expected = if !typed.is_empty() && parsed < 0.01 {
        "0.01"
    } else {
        typed
    };
    page.assert_value("#price", expected).map_err(fail)?;
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: enhancer_proptest_cases(),
        failure_persistence: Some(Box::new(
            FileFailurePersistence::Direct(ENHANCER_PROPTEST_REGRESSION_FILE),
        )),
        .. ProptestConfig::default()
    })]

    #[test]
    fn search_submits_after_each_quiet_period_with_a_long_enough_term(
        keystrokes in keystroke_strategy()
    ) {
        assert_debounced_search(&keystrokes)?;
    }

    #[test]
    fn required_field_markers_match_blank_values(values in vec(required_value_strategy(), 1..=6)) {
        assert_required_fields(&values)?;
    }

    #[test]
    fn typed_prices_never_stay_below_the_minimum(amount in -10.0_f64..10.0, suffix in prop_oneof![Just(""), Just("kg"), Just(" "), Just("x1")]) {
        let typed = format!("{amount}{suffix}");
        assert_price_clamp(&typed)?;
        prop_assert_eq!(parse_float(&typed), amount);
    }

    #[test]
    fn non_numeric_prices_are_left_alone(typed in "[a-z ]{0,6}") {
        assert_price_clamp(&typed)?;
    }
}
