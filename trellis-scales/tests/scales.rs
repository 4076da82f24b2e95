use float_cmp::assert_approx_eq;
use trellis_common::{Channel, ChannelAccessor, DataRecord, Mark, MarkType, RawValue, ScaleName};
use trellis_scales::{
    compute_scales, create_scale, PlotOptions, ScaleOptions, ScaleType, TrellisScaleError,
};

fn rows(field: &str, values: Vec<RawValue>) -> Vec<DataRecord> {
    values
        .into_iter()
        .map(|v| DataRecord::new().with_field(field, v))
        .collect()
}

fn categories() -> Vec<RawValue> {
    vec!["c".into(), "a".into(), "b".into(), "a".into()]
}

#[test]
fn ordinal_domain_is_sorted() -> Result<(), TrellisScaleError> {
    let mark = Mark::new(MarkType::Dot, rows("cat", categories())).channel(Channel::X, "cat");
    let scale = create_scale(ScaleName::X, &[mark], &PlotOptions::default())?;
    assert_eq!(scale.scale_type, ScaleType::Point);
    assert_eq!(
        scale.domain,
        vec![RawValue::from("a"), RawValue::from("b"), RawValue::from("c")]
    );
    Ok(())
}

#[test]
fn sorted_mark_keeps_first_seen_order() -> Result<(), TrellisScaleError> {
    let mark = Mark::new(MarkType::Dot, rows("cat", categories()))
        .channel(Channel::X, "cat")
        .sorted(true);
    let scale = create_scale(ScaleName::X, &[mark], &PlotOptions::default())?;
    assert_eq!(
        scale.domain,
        vec![RawValue::from("c"), RawValue::from("a"), RawValue::from("b")]
    );
    Ok(())
}

#[test]
fn sort_false_keeps_first_seen_order() -> Result<(), TrellisScaleError> {
    let mark = Mark::new(MarkType::Dot, rows("cat", categories())).channel(Channel::Y, "cat");
    let plot = PlotOptions::default().scale(ScaleName::Y, ScaleOptions::default().sort(false));
    let scale = create_scale(ScaleName::Y, &[mark], &plot)?;
    assert_eq!(scale.domain[0], RawValue::from("c"));
    Ok(())
}

#[test]
fn ordinal_y_puts_first_category_on_top() -> Result<(), TrellisScaleError> {
    let mark = Mark::new(MarkType::Dot, rows("cat", categories())).channel(Channel::Y, "cat");
    let scale = create_scale(ScaleName::Y, &[mark], &PlotOptions::default())?;
    let a = scale.apply(&"a".into()).as_number().unwrap_or(f64::NAN);
    let c = scale.apply(&"c".into()).as_number().unwrap_or(f64::NAN);
    assert!(a < c);
    Ok(())
}

#[test]
fn bar_marks_force_band_scale() -> Result<(), TrellisScaleError> {
    let data: Vec<DataRecord> = (0..4)
        .map(|i| {
            DataRecord::new()
                .with_field("year", 2000.0 + i as f64)
                .with_field("v", i as f64)
        })
        .collect();
    let mark = Mark::new(MarkType::BarY, data)
        .channel(Channel::X, "year")
        .channel(Channel::Y, "v");
    let scales = compute_scales(&[mark], &PlotOptions::default())?;

    let x = &scales[&ScaleName::X];
    assert_eq!(x.scale_type, ScaleType::Band);
    assert!(x.bandwidth() > 0.0);
    assert_eq!(scales[&ScaleName::Y].scale_type, ScaleType::Linear);
    assert!(scales[&ScaleName::Color].is_dummy);
    assert!(scales[&ScaleName::Fx].is_dummy);
    Ok(())
}

#[test]
fn literal_colors_skip_the_color_scale() -> Result<(), TrellisScaleError> {
    let mark = Mark::new(
        MarkType::Dot,
        rows("c", vec!["red".into(), "#00ff00".into()]),
    )
    .channel(Channel::Fill, "c");
    let id = mark.id;
    let scale = create_scale(ScaleName::Color, &[mark], &PlotOptions::default())?;
    assert!(scale.is_dummy);
    assert!(scale.skips(&Channel::Fill, id));
    Ok(())
}

#[test]
fn explicit_scale_binding_disables_skip() -> Result<(), TrellisScaleError> {
    let mark = Mark::new(
        MarkType::Dot,
        rows("c", vec!["red".into(), "blue".into()]),
    )
    .channel(
        Channel::Fill,
        ChannelAccessor::with_scale("c", ScaleName::Color),
    );
    let scale = create_scale(ScaleName::Color, &[mark], &PlotOptions::default())?;
    assert!(!scale.is_dummy);
    assert_eq!(scale.scale_type, ScaleType::Categorical);
    Ok(())
}

#[test]
fn opacity_literals_are_unscaled() -> Result<(), TrellisScaleError> {
    let mark = Mark::new(MarkType::Dot, rows("o", vec![0.2.into(), 0.8.into()]))
        .channel(Channel::FillOpacity, "o");
    let scale = create_scale(ScaleName::Opacity, &[mark], &PlotOptions::default())?;
    assert!(scale.is_dummy);

    let mark = Mark::new(MarkType::Dot, rows("o", vec![2.0.into(), 8.0.into()]))
        .channel(Channel::FillOpacity, "o");
    let scale = create_scale(ScaleName::Opacity, &[mark], &PlotOptions::default())?;
    assert_eq!(scale.scale_type, ScaleType::Linear);
    assert_approx_eq!(f64, scale.apply(&5.0.into()).as_number().unwrap_or(f64::NAN), 0.5);
    Ok(())
}

#[test]
fn radius_domain_starts_at_zero() -> Result<(), TrellisScaleError> {
    let mark = Mark::new(MarkType::Dot, rows("size", vec![25.0.into(), 100.0.into()]))
        .channel(Channel::R, "size");
    let scale = create_scale(ScaleName::R, &[mark], &PlotOptions::default())?;
    assert_eq!(scale.scale_type, ScaleType::Sqrt);
    assert_eq!(scale.domain[0], RawValue::from(0.0));
    assert_approx_eq!(
        f64,
        scale.apply(&25.0.into()).as_number().unwrap_or(f64::NAN),
        5.0,
        epsilon = 1e-9
    );
    Ok(())
}

#[test]
fn symbol_palette_depends_on_filled_dots() -> Result<(), TrellisScaleError> {
    let filled = Mark::new(MarkType::Dot, rows("s", vec!["a".into(), "b".into()]))
        .channel(Channel::Symbol, "s")
        .channel(Channel::Fill, "currentColor");
    let scale = create_scale(ScaleName::Symbol, &[filled], &PlotOptions::default())?;
    assert_eq!(scale.apply(&"b".into()), RawValue::from("cross"));

    let stroked = Mark::new(MarkType::Dot, rows("s", vec!["a".into(), "b".into()]))
        .channel(Channel::Symbol, "s");
    let scale = create_scale(ScaleName::Symbol, &[stroked], &PlotOptions::default())?;
    assert_eq!(scale.apply(&"b".into()), RawValue::from("plus"));
    Ok(())
}

#[test]
fn invalid_scale_type_is_an_error() {
    let mark = Mark::new(MarkType::Dot, rows("v", vec![1.0.into()])).channel(Channel::R, "v");
    let plot = PlotOptions::default().scale(
        ScaleName::R,
        ScaleOptions::default().scale_type(ScaleType::Band),
    );
    assert_eq!(
        create_scale(ScaleName::R, &[mark], &plot).err(),
        Some(TrellisScaleError::InvalidScaleType {
            scale: ScaleName::R,
            scale_type: ScaleType::Band,
        })
    );
}

#[test]
fn interval_fills_ordinal_gaps() -> Result<(), TrellisScaleError> {
    let mark = Mark::new(
        MarkType::BarY,
        rows("year", vec![2000.0.into(), 2003.0.into()]),
    )
    .channel(Channel::X, "year");
    let plot = PlotOptions::default().scale(
        ScaleName::X,
        ScaleOptions::default().interval(trellis_scales::Interval::step(1.0)?),
    );
    let scale = create_scale(ScaleName::X, &[mark], &plot)?;
    assert_eq!(scale.domain.len(), 4);
    assert_eq!(scale.domain[1], RawValue::from(2001.0));
    Ok(())
}

#[test]
fn interval_on_continuous_scale_is_ignored() -> Result<(), TrellisScaleError> {
    let mark = Mark::new(MarkType::Dot, rows("v", vec![0.0.into(), 10.0.into()]))
        .channel(Channel::X, "v");
    let plot = PlotOptions::default().scale(
        ScaleName::X,
        ScaleOptions::default().interval(trellis_scales::Interval::step(1.0)?),
    );
    let scale = create_scale(ScaleName::X, &[mark], &plot)?;
    assert_eq!(scale.scale_type, ScaleType::Linear);
    assert_eq!(scale.domain, vec![RawValue::from(0.0), RawValue::from(10.0)]);
    Ok(())
}

#[test]
fn time_scale_from_dates() -> Result<(), TrellisScaleError> {
    let day = 86_400_000;
    let mark = Mark::new(
        MarkType::Line,
        rows(
            "date",
            vec![RawValue::date_from_millis(0), RawValue::date_from_millis(10 * day)],
        ),
    )
    .channel(Channel::X, "date");
    let scale = create_scale(ScaleName::X, &[mark], &PlotOptions::default())?;
    assert_eq!(scale.scale_type, ScaleType::Time);
    assert!(scale.domain.iter().all(|d| d.is_date()));
    assert!(scale.ticks(None).iter().all(|t| t.is_date()));
    Ok(())
}

#[test]
fn plot_options_from_json() -> Result<(), TrellisScaleError> {
    let plot: PlotOptions = serde_json::from_str(
        r#"{"width": 300, "scales": {"x": {"type": "log", "domain": [1, 1000]}}}"#,
    )
    .map_err(|e| TrellisScaleError::InvalidScalePropertyValue(e.to_string()))?;
    let scale = create_scale(ScaleName::X, &[], &plot)?;
    assert_eq!(scale.scale_type, ScaleType::Log);
    assert_approx_eq!(
        f64,
        scale.apply(&1000.0.into()).as_number().unwrap_or(f64::NAN),
        280.0,
        epsilon = 1e-9
    );
    Ok(())
}
