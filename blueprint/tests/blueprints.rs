use std::io::Write;

use blueprint::{Blueprint, BlueprintError};
use toml::Table;

fn model(source: &str) -> Table {
    toml::from_str(source).unwrap()
}

const GREETING: &str = r#"
[[nodes]]
kind = "element"
name = "html"

[[nodes.children]]
kind = "element"
name = "body"

[[nodes.children.children]]
kind = "element"
name = "h1"
attrs = { class = "title", id = "main" }
children = [{ kind = "dynamic", children = [{ kind = "text", value = "Hello {user.name}!" }] }]
"#;

fn greeting(name: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n\t<body>\n\t\t<h1 class=\"title\" id=\"main\">\
         \n\t\t\tHello {name}!\n\t\t</h1>\n\t</body>\n</html>"
    )
}

#[test]
fn renders_and_replays_a_document() {
    let blueprint = Blueprint::parse(GREETING, 0).unwrap();
    assert!(blueprint.validate().is_empty());
    assert!(blueprint.lint().is_empty());

    let view = blueprint.view().unwrap();
    let ada = view.render_with(&model("[user]\nname = \"Ada\"")).unwrap();
    assert_eq!(ada, greeting("Ada"));
    let grace = view.render_with(&model("[user]\nname = \"Grace\"")).unwrap();
    assert_eq!(grace, greeting("Grace"));
    assert_eq!(view.cached_blocks().len(), 2);
}

#[test]
fn each_repeats_children_per_item() {
    let blueprint = Blueprint::parse(
        r#"
[[nodes]]
kind = "element"
name = "ul"

[[nodes.children]]
kind = "dynamic"

[[nodes.children.children]]
kind = "each"
path = "items"
children = [{ kind = "element", name = "li", children = [{ kind = "text", value = "{.}" }] }]
"#,
        0,
    )
    .unwrap();
    let view = blueprint.view().unwrap();

    assert_eq!(
        view.render_with(&model("items = [\"a\", \"b\"]")).unwrap(),
        "\n<ul>\n\t<li>\n\t\ta\n\t</li>\n\t<li>\n\t\tb\n\t</li>\n</ul>"
    );
    assert_eq!(
        view.render_with(&model("items = [\"c\"]")).unwrap(),
        "\n<ul>\n\t<li>\n\t\tc\n\t</li>\n</ul>"
    );
}

#[test]
fn each_items_are_looked_up_before_the_model() {
    let blueprint = Blueprint::parse(
        r#"
[[nodes]]
kind = "dynamic"

[[nodes.children]]
kind = "each"
path = "people"
children = [{ kind = "text", value = "{name} of {team}" }]
"#,
        0,
    )
    .unwrap();
    let view = blueprint.view().unwrap();
    let out = view
        .render_with(&model(
            "team = \"core\"\npeople = [{ name = \"Ada\" }, { name = \"Alan\", team = \"ops\" }]",
        ))
        .unwrap();
    assert_eq!(out, "\nAda of core\nAlan of ops");
}

#[test]
fn missing_model_paths_render_empty() {
    let blueprint = Blueprint::parse(
        r#"
[[nodes]]
kind = "element"
name = "p"
children = [{ kind = "dynamic", children = [{ kind = "text", value = "{nope}" }] }]
"#,
        0,
    )
    .unwrap();
    let out = blueprint.view().unwrap().render_with(&Table::new()).unwrap();
    assert_eq!(out, "\n<p>\n\t\n</p>");
}

#[test]
fn markdown_is_converted_and_written_literally() {
    let blueprint = Blueprint::parse(
        r#"
[[nodes]]
kind = "element"
name = "div"
children = [{ kind = "dynamic", children = [{ kind = "markdown", source = "*hi* {name}" }] }]
"#,
        0,
    )
    .unwrap();
    let out = blueprint
        .view()
        .unwrap()
        .render_with(&model("name = \"Ada\""))
        .unwrap();
    assert_eq!(out, "\n<div>\n\t<p><em>hi</em> Ada</p>\n</div>");
}

#[test]
fn document_header_replaces_the_default() {
    let blueprint = Blueprint::parse(
        r#"
header = "<!doctype html>"

[[nodes]]
kind = "element"
name = "html"
"#,
        0,
    )
    .unwrap();
    assert_eq!(blueprint.header(), Some("<!doctype html>"));
    let out = blueprint.view().unwrap().render_with(&Table::new()).unwrap();
    assert_eq!(out, "<!doctype html>\n<html>\n</html>");
}

#[test]
fn lint_flags_model_data_the_cache_would_freeze() {
    let blueprint = Blueprint::parse(
        r#"
[[nodes]]
kind = "element"
name = "h1"
children = [{ kind = "text", value = "{title}" }]

[[nodes]]
kind = "each"
path = "rows"
"#,
        0,
    )
    .unwrap();
    assert!(blueprint.validate().is_empty());

    let warnings = blueprint.lint();
    assert_eq!(warnings.len(), 2);
    assert!(warnings.iter().all(|w| w.is_warning()));
    assert!(warnings[0].message.contains("`{title}` outside a dynamic region"));
    assert!(warnings[1].message.contains("`each` outside a dynamic region"));

    let view = blueprint.view().unwrap();
    assert_eq!(
        view.render_with(&model("title = \"first\"")).unwrap(),
        "\n<h1>\n\tfirst\n</h1>"
    );
    assert_eq!(
        view.render_with(&model("title = \"second\"")).unwrap(),
        "\n<h1>\n\tfirst\n</h1>"
    );
}

#[test]
fn validation_errors_block_compilation() {
    let source = r#"
[[nodes]]
kind = "element"

[[nodes]]
kind = "each"
path = "  "

[[nodes]]
kind = "dynamic"
children = [{ kind = "dynamic" }]

[[nodes]]
kind = "text"
value = "x"
name = "stray"

[[nodes]]
kind = "element"
name = "br"
children = [{ kind = "text", value = "inside" }]

[[nodes]]
kind = "comment"
value = "{unclosed"
"#;
    let blueprint = Blueprint::parse(source, 3).unwrap();
    let errors = blueprint.validate();
    let messages: Vec<&str> = errors.iter().map(|e| e.message.as_str()).collect();
    assert_eq!(errors.len(), 6, "{messages:?}");
    assert!(messages.contains(&"element node is missing `name`"));
    assert!(messages.contains(&"`each` path is empty"));
    assert!(messages.contains(&"dynamic regions cannot be nested"));
    assert!(messages.contains(&"`name` is not used by text nodes"));
    assert!(messages.contains(&"void element `br` cannot have children"));
    assert!(messages.iter().any(|m| m.starts_with("unclosed placeholder")));
    assert!(errors.iter().all(|e| e.file_id == 3));

    let stray = errors
        .iter()
        .find(|e| e.message.contains("stray") || e.message.contains("`name` is not used"))
        .unwrap();
    assert_eq!(&source[stray.span.clone()], "\"stray\"");

    match blueprint.view() {
        Err(BlueprintError::Invalid(issues)) => assert_eq!(issues.len(), 6),
        other => panic!("expected invalid blueprint, got {other:?}"),
    }
}

#[test]
fn dynamic_region_per_cached_list_item_is_rejected() {
    let source = r#"
[[nodes]]
kind = "element"
name = "ul"

[[nodes.children]]
kind = "each"
path = "items"

[[nodes.children.children]]
kind = "element"
name = "li"
children = [{ kind = "dynamic", children = [{ kind = "text", value = "{.}" }] }]
"#;
    let blueprint = Blueprint::parse(source, 0).unwrap();
    let errors = blueprint.validate();
    assert_eq!(errors.len(), 1);
    assert_eq!(
        errors[0].message,
        "dynamic region inside an `each` that is outside a dynamic region"
    );
    assert_eq!(&source[errors[0].span.clone()], "\"dynamic\"");
    assert!(matches!(blueprint.view(), Err(BlueprintError::Invalid(_))));
}

#[test]
fn list_inside_a_dynamic_region_follows_its_length() {
    let blueprint = Blueprint::parse(
        r#"
[[nodes]]
kind = "element"
name = "ul"

[[nodes.children]]
kind = "dynamic"

[[nodes.children.children]]
kind = "each"
path = "items"
children = [{ kind = "element", name = "li", children = [{ kind = "text", value = "{.}" }] }]
"#,
        0,
    )
    .unwrap();
    assert!(blueprint.validate().is_empty());

    let view = blueprint.view().unwrap();
    for items in [r#"items = ["a", "b"]"#, r#"items = ["x"]"#, r#"items = ["p", "q", "r"]"#] {
        let model = model(items);
        let expected: String = model["items"]
            .as_array()
            .unwrap()
            .iter()
            .map(|item| format!("\n\t<li>\n\t\t{}\n\t</li>", item.as_str().unwrap()))
            .collect();
        assert_eq!(
            view.render_with(&model).unwrap(),
            format!("\n<ul>{expected}\n</ul>")
        );
    }
}

#[test]
fn html_element_must_be_top_level() {
    let source = r#"
[[nodes]]
kind = "element"
name = "div"
children = [{ kind = "element", name = "html" }]
"#;
    let blueprint = Blueprint::parse(source, 0).unwrap();
    let errors = blueprint.validate();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].message, "`html` element must be a top-level node");
    assert_eq!(&source[errors[0].span.clone()], "\"html\"");
}

#[test]
fn malformed_toml_is_a_syntax_error() {
    let err = Blueprint::parse("[[nodes]]\nkind = \"bogus\"\n", 0).unwrap_err();
    assert!(matches!(err, BlueprintError::Syntax { file_id: 0, .. }));
    assert!(err.to_string().contains("bogus"));
    assert_eq!(err.to_diagnostics().len(), 1);

    let err = Blueprint::parse("[[nodes]]\nkind = \"text\"\nvalu = \"typo\"\n", 0).unwrap_err();
    assert!(matches!(err, BlueprintError::Syntax { .. }));
}

#[test]
fn load_reads_from_disk() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(GREETING.as_bytes()).unwrap();

    let blueprint = Blueprint::load(file.path(), 0).unwrap();
    assert_eq!(blueprint.source(), GREETING);
    let out = blueprint
        .view()
        .unwrap()
        .render_with(&model("[user]\nname = \"Ada\""))
        .unwrap();
    assert_eq!(out, greeting("Ada"));

    let missing = file.path().with_extension("missing");
    assert!(matches!(
        Blueprint::load(&missing, 0),
        Err(BlueprintError::Io { .. })
    ));
}

#[test]
fn compiled_views_render_in_parallel() {
    let blueprint = Blueprint::parse(GREETING, 0).unwrap();
    let view = blueprint.view().unwrap().thread_safe().unwrap();
    std::thread::scope(|scope| {
        for worker in 0..4 {
            let view = &view;
            scope.spawn(move || {
                for round in 0..10 {
                    let name = format!("w{worker}r{round}");
                    let model = model(&format!("[user]\nname = \"{name}\""));
                    assert_eq!(view.render_with(&model).unwrap(), greeting(&name));
                }
            });
        }
    });
}
