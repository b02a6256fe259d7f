use std::{cell::RefCell, rc::Rc};

use mapchron::core::{MapView, Plugin, PluginRegistry, SwatchPicker};
use mapchron::{AppCore, BaseMap, Color, ColorUsage, CoreConfig, RegionDict, RegionIndex};

/// Color constants for tests
pub const RED: Color = Color::rgb(0xff, 0x00, 0x00);
pub const BLUE: Color = Color::rgb(0x00, 0x00, 0xff);
pub const GREEN: Color = Color::rgb(0x00, 0xff, 0x00);

/// Shared, ordered log of side effects (map repaints, callbacks, hooks).
pub type Trace = Rc<RefCell<Vec<String>>>;

pub fn new_trace() -> Trace {
    Rc::new(RefCell::new(Vec::new()))
}

/// Builds a GeoJSON base map with `regions` named features.
pub fn sample_basemap(regions: usize) -> BaseMap {
    let features: Vec<_> = (0..regions)
        .map(|i| {
            serde_json::json!({
                "type": "Feature",
                "properties": { "name": format!("Region {}", i) },
                "geometry": { "type": "Point", "coordinates": [i as f64, 0.0] }
            })
        })
        .collect();
    let json = serde_json::json!({ "type": "FeatureCollection", "features": features });
    BaseMap::from_json(&json.to_string()).expect("Failed to build sample base map")
}

#[derive(Debug, Clone, PartialEq)]
pub enum MapCall {
    All(RegionDict),
    Regions(Vec<RegionIndex>),
}

/// Map that records every repaint request and logs it to a trace.
pub struct RecordingMap {
    pub calls: Rc<RefCell<Vec<MapCall>>>,
    pub trace: Trace,
}

impl MapView for RecordingMap {
    fn reset_all_region_style(&mut self, regions: &RegionDict) {
        self.calls.borrow_mut().push(MapCall::All(regions.clone()));
        self.trace.borrow_mut().push("resync:all".to_string());
    }

    fn reset_specified_region_style(&mut self, _regions: &RegionDict, indices: &[RegionIndex]) {
        self.calls.borrow_mut().push(MapCall::Regions(indices.to_vec()));
        self.trace.borrow_mut().push(format!("resync:{:?}", indices));
    }
}

/// A core over a 10-region map, the default two-entry timeline, and a
/// recording map sharing `trace`.
pub struct Harness {
    pub core: AppCore,
    pub map_calls: Rc<RefCell<Vec<MapCall>>>,
    pub trace: Trace,
}

pub fn harness_with(plugins: PluginRegistry, trace: Trace) -> Harness {
    let basemap = sample_basemap(10);
    let map_calls = Rc::new(RefCell::new(Vec::new()));
    let core = AppCore::builder(&basemap)
        .config(CoreConfig::default())
        .plugins(plugins)
        .map(Box::new(RecordingMap {
            calls: map_calls.clone(),
            trace: trace.clone(),
        }))
        .picker(Box::new(SwatchPicker::new(RED)))
        .build();
    Harness {
        core,
        map_calls,
        trace,
    }
}

pub fn harness() -> Harness {
    harness_with(PluginRegistry::new(), new_trace())
}

/// Plugin implementing every hook; each call is logged as `name:hook:arg`.
pub fn tracing_plugin(name: &str, trace: &Trace) -> Plugin {
    let log = |trace: &Trace, name: &str| {
        let trace = trace.clone();
        let name = name.to_string();
        move |entry: String| trace.borrow_mut().push(format!("{}:{}", name, entry))
    };
    let on_add = log(trace, name);
    let on_delete = log(trace, name);
    let on_date = log(trace, name);
    let on_event = log(trace, name);
    let on_active = log(trace, name);
    let on_assign = log(trace, name);
    let on_load = log(trace, name);
    let on_hover_on = log(trace, name);
    let on_hover_out = log(trace, name);
    Plugin::new(name, |scenario| serde_json::json!({ "entries": scenario.len() }))
        .on_add_entry(move |_, index| {
            on_add(format!("onAddEntry:{}", index));
            Ok(())
        })
        .on_delete_entry(move |_, index| {
            on_delete(format!("onDeleteEntry:{}", index));
            Ok(())
        })
        .on_update_event_date(move |_, date| {
            on_date(format!("onUpdateEventDate:{}", date));
            Ok(())
        })
        .on_update_event(move |_, event| {
            on_event(format!("onUpdateEvent:{}", event));
            Ok(())
        })
        .on_update_active_entry(move |_, index| {
            on_active(format!("onUpdateActiveEntry:{}", index));
            Ok(())
        })
        .on_assign_regions(move |_, assignment| {
            on_assign(format!(
                "onAssignRegions:{:?}:{:?}:{:?}:{}",
                assignment.indices,
                assignment.color.map(|c| c.to_string()),
                assignment.removed_colors.iter().map(|c| c.to_string()).collect::<Vec<_>>(),
                assignment.added_color
            ));
            Ok(())
        })
        .on_load_save(move |_, save| {
            on_load(format!("onLoadSave:{}", save.scenario_data.len()));
            Ok(())
        })
        .on_region_hovered_on(move |_, index| {
            on_hover_on(format!("onProcessRegionHoveredOn:{}", index));
            Ok(())
        })
        .on_region_hovered_out(move |_, index| {
            on_hover_out(format!("onProcessRegionHoveredOut:{}", index));
            Ok(())
        })
}

/// Asserts every entry's color usage equals a from-scratch recount.
pub fn assert_usage_consistent(core: &AppCore) {
    assert_eq!(core.entries().len(), core.color_usage().len());
    for (i, (entry, usage)) in core.entries().iter().zip(core.color_usage()).enumerate() {
        assert_eq!(
            *usage,
            ColorUsage::from_regions(entry.regions()),
            "color usage of entry {} drifted",
            i
        );
        assert!(usage.iter().all(|(_, count)| count >= 1));
    }
    assert!(core.active_entry() < core.entries().len());
}
