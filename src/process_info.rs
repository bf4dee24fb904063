/// Módulo de inspección de procesos.
/// Lee los metadatos de un proceso desde /proc: nombre, línea de
/// comandos, directorio de trabajo y momento de inicio.
use procfs::process::Process;

use thiserror::Error;

/// Metadatos de identidad de un proceso, capturados en una sola lectura
#[derive(Debug, Clone)]
pub struct ProcessDetails {
    /// PID del proceso
    pub pid: i32,
    /// Nombre corto del proceso (comm)
    pub name: String,
    /// Línea de comandos completa; vacía para hilos del kernel
    pub command: String,
    /// Directorio de trabajo, con el home del usuario abreviado a ~;
    /// "~" a secas si el cwd no se pudo leer
    pub workdir: String,
    /// Momento de inicio del proceso en segundos UNIX (truncado)
    pub started_secs: u64,
}

/// Error al inspeccionar un proceso: ya terminó, no existe o /proc
/// no es accesible. El agregador lo absorbe conexión por conexión.
#[derive(Debug, Error)]
pub enum InspectError {
    #[error("no se pudo leer /proc: {0}")]
    Proc(#[from] procfs::ProcError),
}

/// Obtiene los metadatos de identidad de un proceso por su PID.
///
/// El nombre, la línea de comandos y el momento de inicio son
/// obligatorios: si alguno falla, el proceso se considera inaccesible.
/// El directorio de trabajo es best-effort y cae al sentinela "~".
///
/// # Arguments
/// * `pid` - ID del proceso a inspeccionar
///
/// # Returns
/// Los metadatos del proceso, o `InspectError` si ya no es accesible.
pub fn inspect_process(pid: i32) -> Result<ProcessDetails, InspectError> {
    let process = Process::new(pid)?;
    let stat = process.stat()?;

    let name = stat.comm.clone();

    let command = process.cmdline()?.join(" ");

    let workdir = match process.cwd() {
        Ok(path) => shorten_home(&path.to_string_lossy(), std::env::var("HOME").ok().as_deref()),
        Err(_) => "~".to_string(),
    };

    // starttime viene en ticks desde el arranque; la división entera
    // trunca a segundos completos
    let started_secs = procfs::boot_time_secs()? + stat.starttime / procfs::ticks_per_second();

    Ok(ProcessDetails {
        pid,
        name,
        command,
        workdir,
        started_secs,
    })
}

/// Abrevia el prefijo del directorio home del usuario a ~.
///
/// # Arguments
/// * `path` - Ruta absoluta a abreviar
/// * `home` - Directorio home del usuario, si se conoce
///
/// # Returns
/// La ruta con el prefijo home reemplazado por ~, o sin cambios.
fn shorten_home(path: &str, home: Option<&str>) -> String {
    if let Some(home) = home {
        if !home.is_empty() {
            if let Some(rest) = path.strip_prefix(home) {
                return format!("~{rest}");
            }
        }
    }
    path.to_string()
}
