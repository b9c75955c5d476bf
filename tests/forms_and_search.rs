use std::cell::Cell;
use std::rc::Rc;

use store_enhancer::enhance::search::pending_submit;
use store_enhancer::{
    KeyInput, MockPlatform, NavigationKind, Page, PageEnhancer, Result,
};

const PAGE_URL: &str = "http://shop.test/products";

fn enhanced(html: &str) -> Result<(Page, MockPlatform)> {
    let platform = MockPlatform::new();
    let mut page = Page::builder()
        .url(PAGE_URL)
        .platform(platform.clone())
        .build(html)?;
    PageEnhancer::default().attach(&mut page)?;
    Ok((page, platform))
}

const PRODUCT_FORM: &str = r#"
    <body>
      <form id="product-form" action="/products" method="post">
        <input id="name" name="name" class="form-control" required>
        <input id="price" name="price" type="number" step="0.01" required value="3.50">
        <select id="category" name="categoryId" class="form-select" required>
          <option value="">Choose a category</option>
          <option value="1">Shoes</option>
        </select>
        <textarea id="description" name="description"></textarea>
        <button id="save" type="submit">Save</button>
      </form>
    </body>
    "#;

#[test]
fn declined_delete_confirmation_cancels_the_link() -> Result<()> {
    let html = r#"<body><a id="del" href="/categories/delete/3" class="btn btn-danger">Delete</a></body>"#;
    let (mut page, platform) = enhanced(html)?;

    page.click("#del")?;
    assert!(page.navigations().is_empty());
    assert_eq!(
        platform.confirm_messages(),
        vec!["Are you sure you want to delete this category?"]
    );
    Ok(())
}

#[test]
fn accepted_delete_confirmation_follows_the_link() -> Result<()> {
    let html = r#"<body><a id="del" href="/products/delete/7">Delete</a></body>"#;
    let (mut page, platform) = enhanced(html)?;
    platform.enqueue_confirm_response(true);

    page.click("#del")?;
    assert_eq!(
        platform.confirm_messages(),
        vec!["Are you sure you want to delete this product?"]
    );
    let navigations = page.take_navigations();
    assert_eq!(navigations.len(), 1);
    assert_eq!(navigations[0].url.as_str(), "http://shop.test/products/delete/7");
    Ok(())
}

#[test]
fn submitting_with_blank_required_fields_marks_them_and_focuses_the_first() -> Result<()> {
    let (mut page, _) = enhanced(PRODUCT_FORM)?;

    page.submit("#product-form")?;
    assert!(page.navigations().is_empty());
    page.assert_class("#name", "is-invalid", true)?;
    page.assert_class("#price", "is-invalid", false)?;
    page.assert_class("#category", "is-invalid", true)?;
    page.assert_class("#description", "is-invalid", false)?;
    assert_eq!(page.dom().active_element(), Some(page.select_one("#name")?));
    Ok(())
}

#[test]
fn focus_goes_to_the_first_marked_field_even_if_the_server_marked_it() -> Result<()> {
    let html = r#"
        <body>
          <form id="f" action="/products" method="post">
            <input id="sku" name="sku" class="form-control is-invalid" value="BAD SKU">
            <input id="name" name="name" required>
          </form>
        </body>
        "#;
    let (mut page, _) = enhanced(html)?;

    page.submit("#f")?;
    assert!(page.navigations().is_empty());
    page.assert_class("#name", "is-invalid", true)?;
    assert_eq!(page.dom().active_element(), Some(page.select_one("#sku")?));
    Ok(())
}

#[test]
fn whitespace_only_values_count_as_blank() -> Result<()> {
    let (mut page, _) = enhanced(PRODUCT_FORM)?;
    page.type_text("#name", "   ")?;
    page.select_value("#category", "1")?;

    page.submit("#product-form")?;
    assert!(page.navigations().is_empty());
    page.assert_class("#name", "is-invalid", true)?;
    page.assert_class("#category", "is-invalid", false)?;
    Ok(())
}

#[test]
fn completed_form_submits_and_clears_markers() -> Result<()> {
    let (mut page, _) = enhanced(PRODUCT_FORM)?;
    page.submit("#product-form")?;
    page.assert_class("#name", "is-invalid", true)?;

    page.type_text("#name", "Trail boots")?;
    page.select_value("#category", "1")?;
    page.submit("#product-form")?;

    page.assert_not_exists(".is-invalid")?;
    let navigations = page.take_navigations();
    assert_eq!(navigations.len(), 1);
    assert_eq!(navigations[0].kind, NavigationKind::FormSubmitted);
    assert_eq!(navigations[0].method, "post");
    assert_eq!(navigations[0].url.as_str(), "http://shop.test/products");
    Ok(())
}

#[test]
fn clicking_the_submit_button_validates_the_form() -> Result<()> {
    let (mut page, _) = enhanced(PRODUCT_FORM)?;

    page.click("#save")?;
    assert!(page.navigations().is_empty());
    page.assert_class("#name", "is-invalid", true)?;
    Ok(())
}

#[test]
fn blur_marks_blank_fields_and_input_only_clears() -> Result<()> {
    let (mut page, _) = enhanced(PRODUCT_FORM)?;

    page.focus("#name")?;
    page.blur("#name")?;
    page.assert_class("#name", "is-invalid", true)?;

    page.type_text("#name", "  ")?;
    page.assert_class("#name", "is-invalid", true)?;

    page.type_text("#name", "Boots")?;
    page.assert_class("#name", "is-invalid", false)?;

    page.type_text("#name", "")?;
    page.assert_class("#name", "is-invalid", false)?;

    page.focus("#name")?;
    page.blur("#name")?;
    page.assert_class("#name", "is-invalid", true)?;
    Ok(())
}

#[test]
fn choosing_a_category_clears_its_marker() -> Result<()> {
    let html = r#"
        <body>
          <select id="cat" name="category" class="form-select is-invalid">
            <option value="">Choose</option>
            <option value="2">Socks</option>
          </select>
        </body>
        "#;
    let (mut page, _) = enhanced(html)?;

    page.select_value("#cat", "")?;
    page.assert_class("#cat", "is-invalid", true)?;
    page.select_value("#cat", "2")?;
    page.assert_class("#cat", "is-invalid", false)?;
    Ok(())
}

#[test]
fn price_entry_below_the_minimum_is_raised() -> Result<()> {
    let html = r#"<body><input id="price" name="price" type="number" step="0.01" min="0"></body>"#;
    let (mut page, _) = enhanced(html)?;

    page.type_text("#price", "0.005")?;
    page.assert_value("#price", "0.01")?;
    page.type_text("#price", "5")?;
    page.assert_value("#price", "5")?;
    page.type_text("#price", "-2")?;
    page.assert_value("#price", "0.01")?;
    page.type_text("#price", "abc")?;
    page.assert_value("#price", "abc")?;
    page.type_text("#price", "")?;
    page.assert_value("#price", "")?;
    Ok(())
}

const SEARCH_FORM: &str = r#"
    <body>
      <form id="search-form" action="/products/search" method="get" class="d-flex">
        <input id="q" name="search" class="form-control" placeholder="Search products">
      </form>
    </body>
    "#;

#[test]
fn enter_submits_the_search_form_without_a_submit_event() -> Result<()> {
    let (mut page, _) = enhanced(SEARCH_FORM)?;
    let form = page.select_one("#search-form")?;
    let submit_events = Rc::new(Cell::new(0));
    let counter = Rc::clone(&submit_events);
    page.add_event_listener(form, "submit", "test.count_submit", false, move |_, _| {
        counter.set(counter.get() + 1);
        Ok(())
    });

    page.type_text("#q", "boots")?;
    page.press_key("#q", KeyInput::new("Enter"))?;

    let navigations = page.take_navigations();
    assert_eq!(navigations.len(), 1);
    assert_eq!(
        navigations[0].url.as_str(),
        "http://shop.test/products/search?search=boots"
    );
    assert_eq!(submit_events.get(), 0);
    Ok(())
}

#[test]
fn enter_cancels_the_pending_debounced_submit() -> Result<()> {
    let (mut page, _) = enhanced(SEARCH_FORM)?;
    let input = page.select_one("#q")?;

    page.type_text("#q", "boots")?;
    assert!(pending_submit(&page, input).is_some());
    page.press_key("#q", KeyInput::new("Enter"))?;
    assert_eq!(pending_submit(&page, input), None);

    page.advance_time(1000)?;
    assert_eq!(page.take_navigations().len(), 1);
    assert!(page.pending_timers().is_empty());
    Ok(())
}

#[test]
fn enter_outside_a_search_form_does_nothing() -> Result<()> {
    let html = r#"<body><form action="/products/filter"><input id="q" name="search"></form></body>"#;
    let (mut page, _) = enhanced(html)?;

    page.press_key("#q", KeyInput::new("Enter"))?;
    assert!(page.navigations().is_empty());
    Ok(())
}

#[test]
fn typing_then_pausing_submits_the_latest_term() -> Result<()> {
    let (mut page, _) = enhanced(SEARCH_FORM)?;

    let input = page.select_one("#q")?;

    page.type_text("#q", "bo")?;
    let first_timer = pending_submit(&page, input);
    page.advance_time(999)?;
    page.type_text("#q", "boo")?;
    assert_ne!(pending_submit(&page, input), first_timer);
    page.advance_time(999)?;
    assert!(page.navigations().is_empty());

    page.advance_time(1)?;
    assert_eq!(pending_submit(&page, input), None);
    let navigations = page.take_navigations();
    assert_eq!(navigations.len(), 1);
    assert_eq!(navigations[0].url.query(), Some("search=boo"));

    page.advance_time(5000)?;
    assert!(page.navigations().is_empty());
    Ok(())
}

#[test]
fn one_character_terms_wait_but_cleared_terms_submit() -> Result<()> {
    let (mut page, _) = enhanced(SEARCH_FORM)?;

    page.type_text("#q", "b")?;
    page.advance_time(1000)?;
    assert!(page.navigations().is_empty());

    page.type_text("#q", "")?;
    page.advance_time(1000)?;
    let navigations = page.take_navigations();
    assert_eq!(navigations.len(), 1);
    assert_eq!(navigations[0].url.query(), Some("search="));
    Ok(())
}

#[test]
fn term_length_counts_characters_not_bytes() -> Result<()> {
    let (mut page, _) = enhanced(SEARCH_FORM)?;

    page.type_text("#q", "é")?;
    page.advance_time(1000)?;
    assert!(page.navigations().is_empty());
    Ok(())
}

#[test]
fn each_search_input_debounces_independently() -> Result<()> {
    let html = r#"
        <body>
          <form id="products" action="/products/search"><input id="pq" name="search"></form>
          <form id="categories" action="/categories/search"><input id="cq" name="search"></form>
        </body>
        "#;
    let (mut page, _) = enhanced(html)?;

    page.type_text("#pq", "boots")?;
    page.advance_time(500)?;
    page.type_text("#cq", "outdoor")?;
    page.advance_time(1000)?;

    let urls = page
        .take_navigations()
        .into_iter()
        .map(|navigation| navigation.url.to_string())
        .collect::<Vec<_>>();
    assert_eq!(
        urls,
        vec![
            "http://shop.test/products/search?search=boots",
            "http://shop.test/categories/search?search=outdoor",
        ]
    );
    Ok(())
}

#[test]
fn empty_search_inputs_take_focus_and_the_last_one_wins() -> Result<()> {
    let html = r#"
        <body>
          <input id="a" name="search">
          <input id="b" name="search" value="boots">
          <input id="c" name="search">
        </body>
        "#;
    let (page, _) = enhanced(html)?;
    assert_eq!(page.dom().active_element(), Some(page.select_one("#c")?));
    Ok(())
}
