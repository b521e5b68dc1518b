use std::io;
use std::sync::Arc;

use htmlflow::{
    Capabilities, DynamicView, Html, Output, Partial, RenderError, Result, StaticView,
    StreamTarget,
};
use parking_lot::Mutex;

struct Person {
    name: String,
}

fn person(name: &str) -> Person {
    Person {
        name: name.to_string(),
    }
}

/// html > body > div[class="c"] > dynamic { name }
fn person_page(html: &mut Html<'_>, person: &Person) -> Result<()> {
    html.html(|html| {
        html.element("body", |body| {
            body.element("div", |div| {
                div.attr("class", "c")?;
                div.dynamic(|div| div.text(&person.name).map(drop))?;
                Ok(())
            })?;
            Ok(())
        })?;
        Ok(())
    })?;
    Ok(())
}

fn expected_person_page(name: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n\t<body>\n\t\t<div class=\"c\">\n\t\t\t{name}\n\t\t</div>\n\t</body>\n</html>"
    )
}

fn task_details(html: &mut Html<'_>) -> Result<()> {
    html.html(|html| {
        html.element("head", |head| {
            head.text_element("title", "Task Details")?;
            head.element("link", |link| {
                link.attr("rel", "stylesheet")?
                    .attr("href", "https://example.com/bootstrap.css")
                    .map(drop)
            })?;
            Ok(())
        })?;
        html.element("body", |body| {
            body.attr("class", "container")?;
            body.text_element("h1", "Task Details")?;
            body.element("hr", |_| Ok(()))?;
            body.element("div", |div| {
                div.text("Title: ISEL MPD project")?
                    .element("br", |_| Ok(()))?
                    .text("Priority: HIGH")
                    .map(drop)
            })?;
            Ok(())
        })?;
        Ok(())
    })?;
    Ok(())
}

#[test]
fn static_view_renders_identically_every_time() {
    let view = StaticView::new(task_details);
    let first = view.render().unwrap();
    for _ in 0..5 {
        assert_eq!(view.render().unwrap(), first);
    }
    assert!(first.starts_with("<!DOCTYPE html>\n<html>\n\t<head>\n\t\t<title>"));
    assert!(first.contains("<link rel=\"stylesheet\" href=\"https://example.com/bootstrap.css\">"));
    assert!(first.contains("<body class=\"container\">"));
    assert!(first.contains("\t\t<hr>\n"));
    assert!(!first.contains("</hr>"));
    assert!(!first.contains("</br>"));
    assert!(first.ends_with("\t</body>\n</html>"));
    assert_eq!(view.cached_blocks().len(), 1);
}

#[test]
fn dynamic_view_only_changes_the_dynamic_region() {
    let view = DynamicView::bind(person_page);

    let alice = view.render_with(&person("Alice")).unwrap();
    assert_eq!(alice, expected_person_page("Alice"));

    let bob = view.render_with(&person("Bob")).unwrap();
    assert_eq!(bob, expected_person_page("Bob"));

    let blocks = view.cached_blocks();
    assert_eq!(blocks.len(), 2);
    assert_eq!(
        blocks[0].text(),
        "<!DOCTYPE html>\n<html>\n\t<body>\n\t\t<div class=\"c\""
    );
    assert_eq!(blocks[1].text(), "\n\t\t</div>\n\t</body>\n</html>");
}

#[test]
fn block_count_follows_dynamic_regions() {
    let view = DynamicView::bind(|html, items: &Vec<String>| {
        html.element("ul", |ul| {
            for item in ["a", "b", "c"] {
                ul.element("li", |li| {
                    li.attr("id", item)?;
                    li.dynamic(|li| li.text(&items.join(",")).map(drop))?;
                    Ok(())
                })?;
            }
            Ok(())
        })?;
        Ok(())
    });

    view.render_with(&vec!["x".to_string()]).unwrap();
    assert_eq!(view.cached_blocks().len(), 4);

    let out = view.render_with(&vec!["y".into(), "z".into()]).unwrap();
    assert_eq!(out.matches("y,z").count(), 3);
    assert_eq!(view.cached_blocks().len(), 4);
}

#[test]
fn replayed_depth_matches_uncached_depth() {
    let seen: Arc<Mutex<Vec<(usize, usize)>>> = Arc::default();
    let record = Arc::clone(&seen);
    let view = DynamicView::bind(move |html, model: &Person| {
        html.element("main", |main| {
            main.element("section", |section| {
                section.dynamic(|section| {
                    let before = section.depth();
                    section.text(&model.name)?;
                    record.lock().push((before, section.depth()));
                    Ok(())
                })?;
                Ok(())
            })?;
            Ok(())
        })?;
        Ok(())
    });

    view.render_with(&person("first")).unwrap();
    view.render_with(&person("second")).unwrap();
    view.render_with(&person("third")).unwrap();

    let seen = seen.lock();
    assert_eq!(seen.len(), 3);
    assert!(seen.iter().all(|depths| *depths == seen[0]));
    assert_eq!(seen[0], (1, 2));
}

#[test]
fn dynamic_view_without_model_fails() {
    let view = DynamicView::bind(person_page);
    assert!(matches!(view.render(), Err(RenderError::ModelMissing)));
    assert!(matches!(view.write(), Err(RenderError::ModelMissing)));
}

#[test]
fn static_view_with_model_fails() {
    let view = StaticView::new(task_details);
    assert!(matches!(
        view.render_with(&()),
        Err(RenderError::ModelNotSupported)
    ));
    assert!(matches!(
        view.write_with(&"model"),
        Err(RenderError::ModelNotSupported)
    ));
}

#[test]
fn dynamic_region_in_static_view_fails() {
    let view = StaticView::empty();
    let err = view
        .visit(|html| {
            html.element("head", |head| {
                head.text_element("title", "Task Details")?;
                head.dynamic(|_| panic!("dynamic callback must not run"))?;
                Ok(())
            })?;
            Ok(())
        })
        .unwrap_err();
    assert!(matches!(err, RenderError::DynamicOnStaticView));
}

#[test]
fn forbidden_thread_safe_stream_combinations() {
    let err = StaticView::empty()
        .thread_safe()
        .unwrap()
        .with_output(Output::Stream(StreamTarget::new(io::sink())))
        .unwrap_err();
    assert!(matches!(err, RenderError::TransportSinkOnThreadSafeView));

    let err = StaticView::empty()
        .with_output(Output::Stream(StreamTarget::new(io::sink())))
        .unwrap()
        .thread_safe()
        .unwrap_err();
    assert!(matches!(err, RenderError::ThreadSafeWithTransportSink));

    let back_to_memory = StaticView::empty()
        .thread_safe()
        .unwrap()
        .with_output(Output::Memory)
        .unwrap();
    assert!(back_to_memory.is_thread_safe());
}

#[test]
fn capability_mismatch_between_binder_and_template() {
    let bound = DynamicView::bind(person_page);
    assert_eq!(bound.capabilities(), Capabilities::MODEL);
    assert!(matches!(
        bound.render_with_partials(&person("x"), &[]),
        Err(RenderError::PartialsNotSupported)
    ));

    let templated = DynamicView::template(|html, model: &Person, _partials| person_page(html, model));
    assert_eq!(templated.capabilities(), Capabilities::PARTIALS);
    assert!(matches!(
        templated.render_with(&person("x")),
        Err(RenderError::ModelMissing)
    ));
    assert_eq!(
        templated.render_with_partials(&person("x"), &[]).unwrap(),
        expected_person_page("x")
    );

    assert_eq!(StaticView::empty().capabilities(), Capabilities::MODELLESS);
}

#[test]
fn builderless_static_view_is_populated_by_visit() {
    let view = StaticView::empty();
    view.visit(|html| {
        html.element("p", |p| p.text("hi").map(drop))?;
        Ok(())
    })
    .unwrap();
    assert_eq!(view.render().unwrap(), "\n<p>\n\thi\n</p>");
    assert_eq!(view.render().unwrap(), "\n<p>\n\thi\n</p>");
}

struct Task {
    title: String,
}

#[test]
fn partials_are_spliced_at_the_parent_depth() {
    let header = StaticView::new(|html| {
        html.element("header", |header| header.text("Tasks").map(drop))?;
        Ok(())
    });
    let row = DynamicView::bind(|html, task: &Task| {
        html.element("div", |div| {
            div.attr("class", "task")?;
            div.dynamic(|div| div.text(&task.title).map(drop))?;
            Ok(())
        })?;
        Ok(())
    });
    let page = DynamicView::template(|html, task: &Task, partials| {
        html.html(|html| {
            html.element("body", |body| {
                body.add_partial(partials[0])?;
                body.dynamic(|body| body.add_partial_with(partials[1], task).map(drop))?;
                Ok(())
            })?;
            Ok(())
        })?;
        Ok(())
    });

    let partials: [&dyn Partial; 2] = [&header, &row];
    let expected = |title: &str| {
        format!(
            "<!DOCTYPE html>\n<html>\n\t<body>\n\t\t<header>\n\t\t\tTasks\n\t\t</header>\
             \n\t\t<div class=\"task\">\n\t\t\t{title}\n\t\t</div>\n\t</body>\n</html>"
        )
    };

    let first = Task {
        title: "Write docs".to_string(),
    };
    let second = Task {
        title: "Ship it".to_string(),
    };
    assert_eq!(
        page.render_with_partials(&first, &partials).unwrap(),
        expected("Write docs")
    );
    assert_eq!(
        page.render_with_partials(&second, &partials).unwrap(),
        expected("Ship it")
    );
}

#[test]
fn partial_with_wrong_model_type_fails() {
    let row = DynamicView::bind(|html, task: &Task| {
        html.dynamic(|html| html.text(&task.title).map(drop))?;
        Ok(())
    });
    let page = DynamicView::bind(move |html, _: &()| {
        html.dynamic(|html| html.add_partial_with(&row, &42u32).map(drop))?;
        Ok(())
    });
    let err = page.render_with(&()).unwrap_err();
    assert!(matches!(err, RenderError::ModelTypeMismatch { .. }));
}

#[test]
fn thread_safe_view_renders_concurrently() {
    let view = DynamicView::bind(person_page).thread_safe().unwrap();
    assert!(view.is_thread_safe());

    std::thread::scope(|scope| {
        for worker in 0..4 {
            let view = &view;
            scope.spawn(move || {
                for round in 0..25 {
                    let name = format!("worker-{worker}-{round}");
                    let out = view.render_with(&person(&name)).unwrap();
                    assert_eq!(out, expected_person_page(&name));
                }
            });
        }
    });
}

#[test]
fn stream_output_writes_every_pass_through() {
    let file = tempfile::NamedTempFile::new().unwrap();
    let target = StreamTarget::new(file.reopen().unwrap());
    let view = DynamicView::bind(person_page)
        .with_output(Output::Stream(target))
        .unwrap();

    view.write_with(&person("Alice")).unwrap();
    view.write_with(&person("Bob")).unwrap();
    assert!(matches!(
        view.render_with(&person("Carol")),
        Err(RenderError::OutputNotRetrievable)
    ));

    let written = std::fs::read_to_string(file.path()).unwrap();
    assert_eq!(
        written,
        expected_person_page("Alice") + &expected_person_page("Bob")
    );
}

#[test]
fn failed_first_pass_does_not_poison_the_cache() {
    let view = DynamicView::bind(|html, person: &Person| {
        html.element("p", |p| {
            p.dynamic(|p| {
                if person.name.is_empty() {
                    return Err(RenderError::Io(io::Error::other("empty name")));
                }
                p.text(&person.name).map(drop)
            })?;
            Ok(())
        })?;
        Ok(())
    });

    assert!(view.render_with(&person("")).is_err());
    assert!(view.cached_blocks().is_empty());
    assert_eq!(
        view.render_with(&person("Dora")).unwrap(),
        "\n<p>\n\tDora\n</p>"
    );
    assert_eq!(
        view.render_with(&person("Eve")).unwrap(),
        "\n<p>\n\tEve\n</p>"
    );
}

#[test]
fn model_outside_dynamic_region_is_frozen_by_the_cache() {
    let view = DynamicView::bind(|html, person: &Person| {
        html.text_element("h1", &person.name)?;
        Ok(())
    });
    assert_eq!(view.render_with(&person("first")).unwrap(), "\n<h1>\n\tfirst\n</h1>");
    assert_eq!(view.render_with(&person("second")).unwrap(), "\n<h1>\n\tfirst\n</h1>");
}

#[test]
fn varying_region_count_replays_by_position() {
    struct Toggle {
        region: bool,
    }
    let view = DynamicView::bind(|html, toggle: &Toggle| {
        html.element("div", |div| {
            if toggle.region {
                div.dynamic(|div| div.text("dynamic").map(drop))?;
            }
            Ok(())
        })?;
        Ok(())
    });

    let full = view.render_with(&Toggle { region: true }).unwrap();
    assert_eq!(full, "\n<div>\n\tdynamic\n</div>");

    // Without the region the leading block is taken for the trailing one.
    let skewed = view.render_with(&Toggle { region: false }).unwrap();
    assert_eq!(skewed, "\n<div");
}

#[test]
fn header_is_injected_per_view() {
    let view = StaticView::new(|html| {
        html.html(|_| Ok(()))?;
        Ok(())
    })
    .with_header("<!doctype html>");
    assert_eq!(view.render().unwrap(), "<!doctype html>\n<html>\n</html>");
}
