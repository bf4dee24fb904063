//! # PortQuien 🔍
//!
//! Herramienta de diagnóstico de línea de comandos para Linux que
//! identifica qué procesos son dueños de sockets cuyo puerto local
//! contiene el fragmento numérico indicado.
//!
//! ## Características
//! - Snapshot único de conexiones TCP/UDP vía `ss` (todos los estados)
//! - Filtro por subcadena sobre el puerto local en decimal
//! - Un bloque por proceso: puertos con sus IPs, comando, directorio,
//!   protocolos, estados y tiempo de ejecución
//! - Los procesos que terminan entre el snapshot y la inspección se
//!   omiten en silencio
//!
//! ## Uso
//! ```text
//! portquien 80
//! ```
//! Lista los procesos con puertos que contienen "80" (80, 8080, 1180...).

mod aggregator;
mod process_info;
mod report;
mod socket_scanner;

use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Context;
use clap::builder::NonEmptyStringValueParser;
use clap::Parser;

/// Argumentos de línea de comandos de PortQuien.
#[derive(Parser)]
#[command(name = "portquien", version)]
#[command(about = "Encuentra qué procesos usan puertos que contengan un fragmento")]
struct Cli {
    /// Fragmento a buscar como subcadena en los puertos locales (ej: "80")
    #[arg(value_parser = NonEmptyStringValueParser::new())]
    fragment: String,
}

/// Punto de entrada principal de PortQuien.
///
/// Inicializa el logging, obtiene el snapshot de conexiones, agrega por
/// proceso e imprime el reporte. Termina con estado distinto de cero
/// solo si el snapshot de conexiones no se pudo obtener.
fn main() -> anyhow::Result<()> {
    // Inicializar logging (nivel WARN por defecto, configurable con RUST_LOG)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_timestamp_secs()
        .init();

    let cli = Cli::parse();

    log::info!("🔍 PortQuien v{} iniciando...", env!("CARGO_PKG_VERSION"));

    let connections = socket_scanner::scan_connections()
        .context("No se pudo obtener la información de conexiones de red")?;
    log::info!("Snapshot con {} conexiones", connections.len());

    let summaries =
        aggregator::aggregate_by_process(&connections, process_info::inspect_process, &cli.fragment);

    if summaries.is_empty() {
        println!(
            "No se encontraron procesos usando puertos que contengan '{}'",
            cli.fragment
        );
        return Ok(());
    }

    let now_secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0);

    print!("{}", report::render_report(&summaries, now_secs));

    Ok(())
}
