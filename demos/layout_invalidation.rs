//! A horizontal box whose layout properties request a re-layout when they
//! change, and whose cached baseline is dropped on the same edge.
//!
//! Run with `cargo run --example layout_invalidation`.

use std::cell::Cell;
use std::rc::Rc;

use proplink::{BooleanProperty, DerivedCache, DoubleProperty, ObservableList, Property};

struct HBox {
    spacing: DoubleProperty,
    fill_height: BooleanProperty,
    children: ObservableList<f64>,
    layout_requests: Rc<Cell<u32>>,
    baseline: Rc<DerivedCache<f64>>,
}

impl HBox {
    fn new() -> Self {
        let layout_requests = Rc::new(Cell::new(0));
        let baseline = Rc::new(DerivedCache::new());

        let request_layout = {
            let layout_requests = Rc::clone(&layout_requests);
            let baseline = Rc::clone(&baseline);
            move || {
                baseline.invalidate();
                layout_requests.set(layout_requests.get() + 1);
            }
        };

        let spacing = Property::builder(0.0)
            .name("spacing")
            .on_invalidated({
                let request_layout = request_layout.clone();
                move |_| request_layout()
            })
            .build();
        let fill_height = Property::builder(true)
            .name("fillHeight")
            .on_invalidated({
                let request_layout = request_layout.clone();
                move |_| request_layout()
            })
            .build();
        let children = ObservableList::named("children");
        children.on_change(move |_| request_layout());

        Self {
            spacing,
            fill_height,
            children,
            layout_requests,
            baseline,
        }
    }

    /// Width needed to place every child next to each other.
    fn pref_width(&self) -> f64 {
        let spacing = self.spacing.get();
        self.children.with(|widths| {
            let gaps = widths.len().saturating_sub(1) as f64;
            widths.iter().sum::<f64>() + gaps * spacing
        })
    }

    fn baseline_offset(&self) -> f64 {
        self.baseline.get_or_compute(|| {
            let tallest = self
                .children
                .with(|widths| widths.iter().copied().fold(0.0, f64::max));
            if self.fill_height.get() {
                tallest
            } else {
                tallest / 2.0
            }
        })
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let hbox = HBox::new();
    hbox.children.extend(vec![40.0, 60.0, 20.0]);
    println!(
        "pref width {} baseline {} after {} layout requests",
        hbox.pref_width(),
        hbox.baseline_offset(),
        hbox.layout_requests.get()
    );

    // Repeated writes without a read only request one layout.
    hbox.spacing.set(4.0).unwrap();
    hbox.spacing.set(8.0).unwrap();
    println!(
        "pref width {} after {} layout requests",
        hbox.pref_width(),
        hbox.layout_requests.get()
    );

    hbox.fill_height.set(false).unwrap();
    println!(
        "baseline {} after {} layout requests",
        hbox.baseline_offset(),
        hbox.layout_requests.get()
    );

    // A layout bound to a shared theme spacing follows the theme.
    let theme_spacing = Property::named("theme.spacing", 12.0);
    hbox.spacing.bind(&theme_spacing).unwrap();
    theme_spacing.set(16.0).unwrap();
    println!("{}", hbox.spacing);
    println!(
        "pref width {} after {} layout requests",
        hbox.pref_width(),
        hbox.layout_requests.get()
    );
}
