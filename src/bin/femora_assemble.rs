use femora::{
    assembly::Progress,
    init_log,
    io::{VTUEncoding, VTUFile},
    model::{Model, ModelConfig},
    Error, Result,
};
use log::info;

fn main() -> Result<()> {
    init_log("info");

    let args = std::env::args().collect::<Vec<_>>();
    if args.len() < 2 || args.len() > 3 {
        return Err(Error::from(&format!(
            "usage: {} <config.json> [out.vtu]",
            args.first().map_or("femora_assemble", String::as_str)
        )));
    }

    let config = ModelConfig::from_file(&args[1])?;
    let mut report = |percent: f64, msg: &str| info!("{percent:5.1}% {msg}");
    let model = Model::from_config(&config, &mut Progress::new(&mut report))?;

    let stats = model.stats()?;
    info!("{stats}");
    println!("{}", serde_json::to_string_pretty(&stats)?);

    if let Some(file_name) = args.get(2) {
        if let Some(mesh) = model.assembled_mesh() {
            VTUFile::from_grid(mesh, VTUEncoding::Binary).export(file_name)?;
            info!("{file_name} written");
        }
    }

    Ok(())
}
