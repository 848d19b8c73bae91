use crate::builder::PlotArgs;

/// Rust source that reproduces `args` through the library API.
///
/// Every argument is written as a quoted literal; optional arguments
/// appear only when set.
pub fn source_text(args: &PlotArgs) -> String {
    let mut calls = vec![format!("plotwrap::PlotArgs::new({:?}, {:?})", args.x, args.y)];

    if let Some(group) = &args.group {
        calls.push(format!(".group({:?})", group));
    }
    calls.push(format!(".plot_type({:?})", args.plot_type));
    if let Some(palette) = &args.palette {
        calls.push(format!(".palette({:?})", palette));
    }
    calls.push(format!(".theme({:?})", args.theme));
    for (method, value) in [
        ("title", &args.title),
        ("subtitle", &args.subtitle),
        ("caption", &args.caption),
    ] {
        if let Some(value) = value {
            calls.push(format!(".{}({:?})", method, value));
        }
    }

    format!(
        "let chart = plotwrap::build_plot(\n    &data,\n    &{},\n)?;\n",
        calls.join("\n        ")
    )
}
