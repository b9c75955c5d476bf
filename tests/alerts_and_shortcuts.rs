use store_enhancer::{
    BootstrapToolkit, KeyInput, MockPlatform, NavigationKind, Page, PageEnhancer, Result,
};

fn enhanced(html: &str) -> Result<(Page, BootstrapToolkit)> {
    let toolkit = BootstrapToolkit::new();
    let mut page = Page::builder()
        .url("http://shop.test/products")
        .toolkit(toolkit.clone())
        .platform(MockPlatform::new())
        .build(html)?;
    PageEnhancer::default().attach(&mut page)?;
    Ok((page, toolkit))
}

#[test]
fn alerts_present_at_load_close_after_five_seconds() -> Result<()> {
    let html = r#"
        <body>
          <div class="alert alert-success alert-dismissible fade show">Product saved</div>
          <div class="alert alert-warning">Low stock</div>
        </body>
        "#;
    let (mut page, toolkit) = enhanced(html)?;

    page.advance_time(4999)?;
    assert_eq!(page.select_all(".alert")?.len(), 2);

    page.advance_time(1)?;
    page.assert_not_exists(".alert")?;
    assert_eq!(toolkit.closed_alerts().len(), 2);
    assert!(page.take_listener_errors().is_empty());
    Ok(())
}

#[test]
fn alert_removed_before_its_timer_fires_is_left_alone() -> Result<()> {
    let html = r#"<body><div id="flash" class="alert alert-info">Welcome</div></body>"#;
    let (mut page, toolkit) = enhanced(html)?;
    let alert = page.select_one("#flash")?;
    page.dom_mut().detach(alert);

    page.advance_time(5000)?;
    assert!(toolkit.closed_alerts().is_empty());
    assert!(page.take_listener_errors().is_empty());
    Ok(())
}

#[test]
fn closed_alerts_release_the_listeners_inside_them() -> Result<()> {
    let html = r#"
        <body>
          <div id="flash" class="alert alert-warning">
            Category in use. <a id="del" href="/categories/delete/2">Delete anyway</a>
          </div>
        </body>
        "#;
    let (mut page, _) = enhanced(html)?;
    let link = page.select_one("#del")?;
    assert_eq!(page.listener_count(link, "click"), 1);

    page.advance_time(5000)?;
    page.assert_not_exists("#flash")?;
    assert_eq!(page.listener_count(link, "click"), 0);
    Ok(())
}

#[test]
fn escape_dismisses_every_alert() -> Result<()> {
    let html = r#"
        <body>
          <div class="alert alert-danger">Category in use</div>
          <div class="alert alert-info">Tip</div>
        </body>
        "#;
    let (mut page, toolkit) = enhanced(html)?;

    page.press_global_key(KeyInput::new("Escape"))?;
    page.assert_not_exists(".alert")?;
    assert_eq!(toolkit.closed_alerts().len(), 2);

    page.advance_time(5000)?;
    assert_eq!(toolkit.closed_alerts().len(), 2);
    assert!(page.take_listener_errors().is_empty());
    Ok(())
}

#[test]
fn ctrl_n_follows_the_first_new_item_link() -> Result<()> {
    let html = r#"
        <body>
          <a id="new-product" class="btn btn-primary" href="/products/new">Add product</a>
          <a id="new-category" href="/categories/new">Add category</a>
        </body>
        "#;
    let (mut page, _) = enhanced(html)?;

    let keydown = page.press_global_key(KeyInput::new("n").with_ctrl())?;
    assert!(keydown.default_prevented());

    let navigations = page.take_navigations();
    assert_eq!(navigations.len(), 1);
    assert_eq!(navigations[0].kind, NavigationKind::LinkFollowed);
    assert_eq!(navigations[0].url.as_str(), "http://shop.test/products/new");
    Ok(())
}

#[test]
fn cmd_n_works_like_ctrl_n() -> Result<()> {
    let html = r#"<body><a href="/categories/new">Add category</a></body>"#;
    let (mut page, _) = enhanced(html)?;

    let keydown = page.press_global_key(KeyInput::new("n").with_meta())?;
    assert!(keydown.default_prevented());
    assert_eq!(
        page.navigations()[0].url.as_str(),
        "http://shop.test/categories/new"
    );
    Ok(())
}

#[test]
fn ctrl_n_without_a_new_item_link_keeps_the_browser_default() -> Result<()> {
    let html = r#"<body><a href="/products">All products</a></body>"#;
    let (mut page, _) = enhanced(html)?;

    let keydown = page.press_global_key(KeyInput::new("n").with_ctrl())?;
    assert!(!keydown.default_prevented());
    assert!(page.navigations().is_empty());
    Ok(())
}

#[test]
fn plain_n_is_not_a_shortcut() -> Result<()> {
    let html = r#"<body><a href="/products/new">Add product</a></body>"#;
    let (mut page, _) = enhanced(html)?;

    let keydown = page.press_global_key(KeyInput::new("n"))?;
    assert!(!keydown.default_prevented());
    assert!(page.navigations().is_empty());
    Ok(())
}

#[test]
fn shortcut_click_can_be_canceled_by_a_link_listener() -> Result<()> {
    let html = r#"<body><a id="new" href="/products/new">Add product</a></body>"#;
    let (mut page, _) = enhanced(html)?;
    let link = page.select_one("#new")?;
    page.add_event_listener(link, "click", "test.block_new", false, |_, event| {
        event.prevent_default();
        Ok(())
    });

    let keydown = page.press_global_key(KeyInput::new("n").with_ctrl())?;
    assert!(keydown.default_prevented());
    assert!(page.navigations().is_empty());
    Ok(())
}
