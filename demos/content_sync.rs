//! Keeping a model list and two views in sync with content bindings.
//!
//! Run with `RUST_LOG=proplink=debug cargo run --example content_sync` to see
//! the bindings being wired and torn down.

use proplink::{ListProperty, ObservableList, Result};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let model = ObservableList::named("model");
    model.extend(["inbox", "drafts"].map(String::from));

    // A read-only mirror follows the model one way.
    let sidebar = ObservableList::named("sidebar");
    sidebar.bind_content(&model)?;

    // An editable view stays equal to the model in both directions.
    let editor = ListProperty::named("editor", ObservableList::new());
    editor.bind_content_bidirectional(&model)?;
    editor.on_list_change(|change| {
        println!(
            "editor: {:?} replaced by {:?} at {}",
            change.removed(),
            change.added(),
            change.from()
        )
    });

    editor.push("archive".to_string())?;
    model.remove(0);
    println!("model   {:?}", model.to_vec());
    println!("sidebar {:?}", sidebar.to_vec());
    println!("editor  {:?}", editor.to_vec());

    // Switching the editor to a one-way binding is refused.
    if let Err(err) = editor.bind_content(&model) {
        println!("refused: {err}");
    }

    // Writing to the mirror directly ends its binding.
    sidebar.push("scratch".to_string());
    model.push("spam".to_string());
    println!(
        "sidebar {:?} (still bound: {})",
        sidebar.to_vec(),
        sidebar.is_content_bound()
    );

    editor.unbind_content_bidirectional(&model)?;
    model.clear();
    println!("after unbind, editor keeps {:?}", editor.to_vec());
    Ok(())
}
