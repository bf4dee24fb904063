/// Módulo de correlación y agregación.
/// Filtra las conexiones cuyo puerto local contiene el fragmento
/// buscado, las agrupa por proceso dueño y acumula por proceso los
/// protocolos, estados, puertos y direcciones IP vistos.
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Display;

use crate::process_info::ProcessDetails;
use crate::socket_scanner::ConnectionInfo;

/// Resumen acumulado de las conexiones de un proceso.
///
/// La identidad (nombre, PID, comando, directorio, inicio) se captura
/// una sola vez, la primera vez que aparece el PID; los cuatro conjuntos
/// se acumulan con cada conexión que coincide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessSummary {
    /// Nombre corto del proceso
    pub name: String,
    /// PID del proceso
    pub pid: i32,
    /// Línea de comandos completa
    pub command: String,
    /// Directorio de trabajo abreviado
    pub workdir: String,
    /// Momento de inicio en segundos UNIX
    pub started_secs: u64,
    /// Etiquetas de protocolo vistas (TCP, UDP, OTHER)
    pub protocols: BTreeSet<&'static str>,
    /// Estados de conexión distintos vistos
    pub states: BTreeSet<String>,
    /// Puertos locales distintos vistos
    pub ports: BTreeSet<u16>,
    /// Direcciones IP formateadas por puerto; las claves coinciden
    /// exactamente con el conjunto de puertos
    pub port_ips: BTreeMap<u16, BTreeSet<String>>,
}

impl ProcessSummary {
    /// Crea un resumen vacío sembrado con la identidad del proceso.
    fn new(details: ProcessDetails) -> Self {
        Self {
            name: details.name,
            pid: details.pid,
            command: details.command,
            workdir: details.workdir,
            started_secs: details.started_secs,
            protocols: BTreeSet::new(),
            states: BTreeSet::new(),
            ports: BTreeSet::new(),
            port_ips: BTreeMap::new(),
        }
    }
}

/// Decide si un puerto coincide con el fragmento buscado.
///
/// El puerto se renderiza en decimal canónico y el fragmento debe
/// aparecer como subcadena contigua en cualquier posición. Sin anclado
/// ni semántica de rangos: el fragmento "8" coincide con 8, 18, 80,
/// 8080, etc. Es una laxitud deliberada para escaneos rápidos.
///
/// # Arguments
/// * `port` - Puerto local a evaluar
/// * `fragment` - Fragmento buscado por el usuario
pub fn port_matches_fragment(port: u16, fragment: &str) -> bool {
    port.to_string().contains(fragment)
}

/// Formatea una dirección IP para el reporte.
///
/// Las direcciones IPv6 se envuelven en corchetes; el comodín :: y el
/// loopback ::1 usan sus literales entre corchetes. IPv4 queda igual.
///
/// # Arguments
/// * `ip` - Dirección IP en forma textual, sin corchetes
pub fn format_ip(ip: &str) -> String {
    if ip == "::" {
        "[::]".to_string()
    } else if ip == "::1" {
        "[::1]".to_string()
    } else if ip.contains(':') {
        format!("[{ip}]")
    } else {
        ip.to_string()
    }
}

/// Agrupa por proceso las conexiones cuyo puerto coincide con el fragmento.
///
/// Para cada conexión que pasa el filtro: si el PID todavía no está en
/// el mapa, se consulta `inspect` una vez; si la consulta falla (el
/// proceso terminó entre el snapshot y la inspección), la conexión se
/// descarta en silencio. Los sockets sin PID (del kernel) se excluyen
/// sin consultar al inspector.
///
/// # Arguments
/// * `connections` - Snapshot de conexiones del sistema
/// * `inspect` - Consulta de metadatos por PID, invocada bajo demanda
/// * `fragment` - Fragmento de puerto buscado
///
/// # Returns
/// Mapa de PID a resumen, con a lo sumo una entrada por proceso;
/// vacío si ninguna conexión pasa el filtro o toda inspección falla.
pub fn aggregate_by_process<E: Display>(
    connections: &[ConnectionInfo],
    mut inspect: impl FnMut(i32) -> Result<ProcessDetails, E>,
    fragment: &str,
) -> BTreeMap<i32, ProcessSummary> {
    let mut summaries: BTreeMap<i32, ProcessSummary> = BTreeMap::new();

    for conn in connections {
        if !port_matches_fragment(conn.local_port, fragment) {
            continue;
        }

        // Sockets del kernel o sin permisos: no hay proceso que inspeccionar
        if conn.pid <= 0 {
            continue;
        }

        let summary = match summaries.entry(conn.pid) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => match inspect(conn.pid) {
                Ok(details) => entry.insert(ProcessSummary::new(details)),
                Err(err) => {
                    // El proceso terminó entre el snapshot y la inspección;
                    // se descarta solo esta conexión
                    log::debug!("Conexión descartada ({conn}): {err}");
                    continue;
                }
            },
        };

        summary.protocols.insert(conn.protocol.label());
        summary.states.insert(conn.state.clone());
        summary.ports.insert(conn.local_port);
        summary
            .port_ips
            .entry(conn.local_port)
            .or_default()
            .insert(format_ip(&conn.local_ip));
    }

    summaries
}
