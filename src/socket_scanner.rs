/// Módulo de escaneo de conexiones de red.
/// Lee todas las conexiones TCP/UDP del sistema usando el comando `ss`
/// y parsea la salida para obtener un snapshot estructurado: protocolo,
/// estado, dirección local, dirección remota y PID del proceso dueño.
use std::process::Command;

use thiserror::Error;

/// Protocolo de transporte de una conexión.
///
/// Conjunto cerrado de tres valores: cualquier cosa que no sea TCP o UDP
/// se clasifica como `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Tcp,
    Udp,
    /// Cualquier tipo de socket que no sea TCP ni UDP
    #[allow(dead_code)]
    Other,
}

impl Protocol {
    /// Etiqueta textual del protocolo para los reportes.
    pub fn label(self) -> &'static str {
        match self {
            Protocol::Tcp => "TCP",
            Protocol::Udp => "UDP",
            Protocol::Other => "OTHER",
        }
    }
}

/// Información de una conexión de red abierta en el sistema
#[derive(Debug, Clone)]
#[allow(dead_code)]
pub struct ConnectionInfo {
    /// Protocolo de la conexión
    pub protocol: Protocol,
    /// Estado reportado por ss (LISTEN, ESTAB, UNCONN, TIME-WAIT, ...)
    pub state: String,
    /// Dirección IP local, sin corchetes ni sufijo %interfaz
    pub local_ip: String,
    /// Número del puerto local
    pub local_port: u16,
    /// Dirección IP remota, si la conexión tiene par
    pub remote_ip: Option<String>,
    /// Puerto remoto, `None` cuando ss muestra `*`
    pub remote_port: Option<u16>,
    /// PID del proceso dueño del socket; 0 si ss no lo reporta
    /// (sockets del kernel o sin permisos para verlo)
    pub pid: i32,
}

impl std::fmt::Display for ConnectionInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {}:{} [{}] (PID: {})",
            self.protocol.label(),
            self.local_ip,
            self.local_port,
            self.state,
            self.pid
        )
    }
}

/// Error fatal del escáner: no se pudo obtener el snapshot de conexiones.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("no se pudo ejecutar el comando ss: {0}")]
    Launch(#[source] std::io::Error),
    #[error("el comando ss terminó con estado {0}")]
    Failed(std::process::ExitStatus),
    #[error("la salida de ss no es UTF-8 válido: {0}")]
    Output(#[from] std::string::FromUtf8Error),
}

/// Escanea todas las conexiones TCP y UDP del sistema.
///
/// Ejecuta `ss -tnpaH` y `ss -unpaH` para obtener el snapshot completo
/// (todos los estados, no solo LISTEN). Requiere permisos de root para
/// ver los PIDs de otros usuarios.
///
/// # Returns
/// Vector con la información de cada conexión encontrada, o `ScanError`
/// si el comando no se pudo ejecutar en absoluto.
pub fn scan_connections() -> Result<Vec<ConnectionInfo>, ScanError> {
    let mut connections: Vec<ConnectionInfo> = Vec::new();

    for (flags, protocol) in [("-tnpaH", Protocol::Tcp), ("-unpaH", Protocol::Udp)] {
        let raw_output = execute_ss_command(flags)?;
        let parsed = parse_ss_output(&raw_output, protocol);
        log::debug!(
            "{} conexiones {} detectadas",
            parsed.len(),
            protocol.label()
        );
        connections.extend(parsed);
    }

    Ok(connections)
}

/// Ejecuta el comando `ss` con los flags indicados.
///
/// # Arguments
/// * `flags` - Flags para el comando ss (ej: "-tnpaH")
///
/// # Returns
/// La salida del comando, o `ScanError` si tanto la invocación con sudo
/// como el fallback sin sudo fallan.
fn execute_ss_command(flags: &str) -> Result<String, ScanError> {
    // Intentar primero con sudo para ver PIDs de todos los procesos
    let result = Command::new("sudo").args(["-n", "ss", flags]).output();

    match result {
        Ok(output) if output.status.success() => Ok(String::from_utf8(output.stdout)?),
        _ => {
            // Fallback sin sudo (solo verá procesos propios)
            log::warn!("Ejecutando ss sin sudo - solo se verán procesos propios");
            let fallback = Command::new("ss")
                .arg(flags)
                .output()
                .map_err(ScanError::Launch)?;

            if !fallback.status.success() {
                return Err(ScanError::Failed(fallback.status));
            }

            Ok(String::from_utf8(fallback.stdout)?)
        }
    }
}

/// Parsea la salida del comando `ss` para extraer las conexiones.
///
/// Formato esperado de ss -tnpaH:
/// ```text
/// LISTEN  0  128  0.0.0.0:8080  0.0.0.0:*  users:(("node",pid=1234,fd=5))
/// ESTAB   0  0    10.0.0.5:44321  93.184.216.34:443  users:(("curl",pid=88,fd=3))
/// ```
///
/// # Arguments
/// * `output` - Salida cruda del comando ss
/// * `protocol` - Protocolo a asignar a cada conexión
///
/// # Returns
/// Vector con la información parseada de cada conexión.
fn parse_ss_output(output: &str, protocol: Protocol) -> Vec<ConnectionInfo> {
    output
        .lines()
        .filter_map(|line| parse_single_line(line, protocol))
        .collect()
}

/// Parsea una línea individual de la salida de `ss`.
///
/// Extrae el estado (primer campo), las direcciones local y remota,
/// y el PID de la sección "users:". Las líneas sin sección users
/// se conservan con PID 0 (sockets del kernel o sin permisos).
///
/// # Arguments
/// * `line` - Línea individual de la salida de ss
/// * `protocol` - Protocolo a asignar
///
/// # Returns
/// `Some(ConnectionInfo)` si se pudo parsear exitosamente, `None` en caso contrario.
fn parse_single_line(line: &str, protocol: Protocol) -> Option<ConnectionInfo> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let parts: Vec<&str> = line.split_whitespace().collect();

    // Formato: [Estado, RecvQ, SendQ, DirLocal, DirRemota, users:...]
    let state = (*parts.first()?).to_string();

    // Buscar los campos con formato dirección:puerto. El primero es la
    // dirección local, el segundo la remota. Los campos que no parsean
    // (ej: la sección users: con nombres que contienen puntos) se ignoran.
    let mut endpoints = parts
        .iter()
        .filter(|part| looks_like_address(part))
        .filter_map(|part| split_address(part));

    let (local_ip, local_port) = endpoints.next()?;
    // Un socket sin puerto local concreto no es una conexión útil
    let local_port = local_port.filter(|port| *port > 0)?;

    let (remote_ip, remote_port) = match endpoints.next() {
        Some((ip, port)) => (Some(ip), port),
        None => (None, None),
    };

    let pid = extract_pid(line).unwrap_or(0);

    Some(ConnectionInfo {
        protocol,
        state,
        local_ip,
        local_port,
        remote_ip,
        remote_port,
        pid,
    })
}

/// Decide si un campo de `ss` parece una dirección IP:PUERTO.
///
/// Solo consideramos campos que contienen '.' (IPv4), '[' o "::" (IPv6)
/// o que empiezan con '*' (comodín), para no confundirlos con valores
/// numéricos simples como el backlog.
fn looks_like_address(part: &str) -> bool {
    part.contains('.') || part.contains('[') || part.contains("::") || part.starts_with('*')
}

/// Separa un campo dirección:puerto de `ss` en sus componentes.
///
/// Limpia los corchetes de IPv6 y el sufijo de interfaz (%eth0), y
/// normaliza el comodín `*` a "0.0.0.0". El puerto `*` se devuelve
/// como `None` (socket sin puerto remoto fijo).
///
/// # Arguments
/// * `token` - Campo con formato "dirección:puerto"
///
/// # Returns
/// Tupla (dirección limpia, puerto) o `None` si el campo no parsea.
fn split_address(token: &str) -> Option<(String, Option<u16>)> {
    let colon_pos = token.rfind(':')?;
    let addr_part = &token[..colon_pos];
    let port_str = &token[colon_pos + 1..];

    let port = if port_str == "*" {
        None
    } else {
        Some(port_str.parse::<u16>().ok()?)
    };

    let cleaned = addr_part.trim_start_matches('[').trim_end_matches(']');
    let cleaned = match cleaned.find('%') {
        Some(pos) => &cleaned[..pos],
        None => cleaned,
    };
    let cleaned = if cleaned == "*" { "0.0.0.0" } else { cleaned };

    Some((cleaned.to_string(), port))
}

/// Extrae el PID de la sección "users:" de una línea de ss.
///
/// Busca el patrón: users:(("nombre",pid=1234,fd=5))
///
/// # Arguments
/// * `line` - Línea completa de ss
///
/// # Returns
/// `Some(PID)` si se encuentra, `None` en caso contrario.
fn extract_pid(line: &str) -> Option<i32> {
    let pid_marker = "pid=";
    let pid_start = line.find(pid_marker)? + pid_marker.len();
    let pid_end = line[pid_start..]
        .find(|c: char| !c.is_ascii_digit())
        .map(|i| i + pid_start)
        .unwrap_or(line.len());
    line[pid_start..pid_end].parse().ok()
}
