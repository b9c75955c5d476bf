use store_enhancer::{
    BootstrapToolkit, EnhancerConfig, Error, KeyInput, MockPlatform, Page, PageEnhancer, Result,
};

const CATALOG: &str = r#"
    <body>
      <div class="alert alert-success">Category created</div>
      <a id="del" href="/categories/delete/5">Delete</a>
      <form id="search" action="/categories/search"><input id="q" name="search"></form>
      <button id="tip" data-bs-toggle="tooltip" title="Help">?</button>
      <div id="late-content"></div>
    </body>
    "#;

fn catalog_page() -> Result<(Page, MockPlatform, BootstrapToolkit)> {
    let platform = MockPlatform::new();
    let toolkit = BootstrapToolkit::new();
    let page = Page::builder()
        .url("http://shop.test/categories")
        .platform(platform.clone())
        .toolkit(toolkit.clone())
        .build(CATALOG)?;
    Ok((page, platform, toolkit))
}

#[test]
fn attaching_twice_binds_each_behavior_once() -> Result<()> {
    let (mut page, platform, toolkit) = catalog_page()?;
    let enhancer = PageEnhancer::default();
    enhancer.attach(&mut page)?;
    let timers = page.pending_timers().len();
    enhancer.attach(&mut page)?;

    assert_eq!(page.pending_timers().len(), timers);
    assert_eq!(toolkit.instance_count(), 1);

    let link = page.select_one("#del")?;
    let input = page.select_one("#q")?;
    assert_eq!(page.listener_count(link, "click"), 1);
    assert_eq!(page.listener_count(input, "input"), 1);
    assert_eq!(page.listener_count(input, "keypress"), 1);

    page.click("#del")?;
    assert_eq!(platform.confirm_messages().len(), 1);

    page.type_text("#q", "outdoor")?;
    page.advance_time(1000)?;
    assert_eq!(page.take_navigations().len(), 1);
    Ok(())
}

#[test]
fn attach_within_binds_content_rendered_later() -> Result<()> {
    let (mut page, platform, toolkit) = catalog_page()?;
    let enhancer = PageEnhancer::default();
    enhancer.attach(&mut page)?;
    page.advance_time(1000)?;

    let container = page.select_one("#late-content")?;
    page.dom_mut().set_inner_html(
        container,
        r#"<div id="late-alert" class="alert alert-info">Imported 3 products</div>
           <a id="late-del" href="/products/delete/9">Delete</a>
           <span data-bs-toggle="popover">i</span>"#,
    )?;
    let report = enhancer.attach_within(&mut page, container)?;
    assert_eq!(report.count("alerts"), 1);
    assert_eq!(report.count("delete_confirm"), 1);
    assert_eq!(report.count("widgets"), 1);
    assert_eq!(toolkit.instance_count(), 2);

    page.click("#late-del")?;
    assert_eq!(
        platform.confirm_messages(),
        vec!["Are you sure you want to delete this product?"]
    );

    // The original alert closes at 5000ms, the late one 5000ms after it was bound.
    page.advance_time(4000)?;
    page.assert_exists("#late-alert")?;
    page.advance_time(1000)?;
    page.assert_not_exists(".alert")?;
    Ok(())
}

#[test]
fn rerendered_form_controls_keep_their_markup_values() -> Result<()> {
    let (mut page, _, _) = catalog_page()?;
    let enhancer = PageEnhancer::default();
    enhancer.attach(&mut page)?;

    let slot = page.select_one("#late-content")?;
    page.set_inner_html(
        slot,
        r#"<form id="f" action="/products" method="post">
             <select id="cat" name="categoryId" required>
               <option value="">Choose</option>
               <option value="1" selected>Shoes</option>
             </select>
             <textarea id="d" name="description" required>Nice boots</textarea>
           </form>"#,
    )?;
    enhancer.attach_within(&mut page, slot)?;
    page.assert_value("#cat", "1")?;
    page.assert_value("#d", "Nice boots")?;

    page.submit("#f")?;
    page.assert_class("#cat", "is-invalid", false)?;
    page.assert_class("#d", "is-invalid", false)?;
    assert_eq!(page.take_navigations().len(), 1);
    Ok(())
}

#[test]
fn search_input_rendered_inside_an_existing_search_form_submits_on_enter() -> Result<()> {
    let html = r#"
        <body>
          <form id="search" action="/products/search"><div id="field"></div></form>
        </body>
        "#;
    let mut page = Page::from_html_with_url("http://shop.test/products", html)?;
    let enhancer = PageEnhancer::default();
    enhancer.attach(&mut page)?;

    let field = page.select_one("#field")?;
    page.set_inner_html(field, r#"<input id="q" name="search" value="boots">"#)?;
    enhancer.attach_within(&mut page, field)?;

    page.press_key("#q", KeyInput::new("Enter"))?;
    let navigations = page.take_navigations();
    assert_eq!(navigations.len(), 1);
    assert_eq!(navigations[0].url.query(), Some("search=boots"));
    Ok(())
}

#[test]
fn a_failing_host_listener_does_not_block_the_confirmation() -> Result<()> {
    let (mut page, platform, _) = catalog_page()?;
    let link = page.select_one("#del")?;
    page.add_event_listener(link, "click", "host.analytics", false, |_, _| {
        Err(Error::Runtime("analytics endpoint unavailable".into()))
    });
    PageEnhancer::default().attach(&mut page)?;

    page.click("#del")?;
    assert_eq!(platform.confirm_messages().len(), 1);
    assert!(page.navigations().is_empty());
    assert_eq!(
        page.take_listener_errors(),
        vec![Error::Runtime("analytics endpoint unavailable".into())]
    );
    Ok(())
}

#[test]
fn toml_config_changes_the_delays() -> Result<()> {
    let (mut page, _, _) = catalog_page()?;
    let enhancer = PageEnhancer::from_toml_str(
        r#"
        alert_dismiss_ms = 200
        search_debounce_ms = 300
        "#,
    )?;
    enhancer.attach(&mut page)?;

    page.type_text("#q", "garden")?;
    page.advance_time(200)?;
    page.assert_not_exists(".alert")?;
    assert!(page.navigations().is_empty());

    page.advance_time(100)?;
    assert_eq!(page.take_navigations().len(), 1);
    Ok(())
}

#[test]
fn invalid_toml_config_is_reported() {
    let err = PageEnhancer::from_toml_str("search_min_chars = \"two\"").unwrap_err();
    assert!(matches!(err, Error::Config(_)));

    let err = PageEnhancer::from_toml_str("price_minimum = 0.0").unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

#[test]
fn custom_labels_flow_into_the_markup() -> Result<()> {
    let html = r#"
        <body>
          <form action="/products" method="post"><button id="save" type="submit">Save</button></form>
          <button id="copy" data-action="copy" data-copy-text="SKU-1">Copy</button>
        </body>
        "#;
    let mut page = Page::from_html(html)?;
    let config = EnhancerConfig {
        processing_label: "Saving...".into(),
        copy_success_message: "SKU copied".into(),
        ..EnhancerConfig::default()
    };
    PageEnhancer::new(config).attach(&mut page)?;

    page.click("#save")?;
    page.assert_text("#save", "Saving...")?;
    page.click("#copy")?;
    page.assert_text(".toast-body", "SKU copied")?;
    Ok(())
}
