/// Módulo de renderizado del reporte.
/// Convierte los resúmenes por proceso en bloques de texto ordenados,
/// con una línea de total al final.
use std::collections::BTreeMap;

use crate::aggregator::ProcessSummary;

/// Renderiza el reporte completo: un bloque por proceso en orden de PID
/// ascendente y la línea de total.
///
/// # Arguments
/// * `summaries` - Resúmenes agregados por PID
/// * `now_secs` - Momento actual en segundos UNIX, para calcular el uptime
///
/// # Returns
/// El reporte como texto plano listo para imprimir.
pub fn render_report(summaries: &BTreeMap<i32, ProcessSummary>, now_secs: u64) -> String {
    let mut out = String::new();

    for summary in summaries.values() {
        render_block(&mut out, summary, now_secs);
    }

    out.push_str(&format!(
        "Total: {} procesos encontrados\n",
        summaries.len()
    ));

    out
}

/// Renderiza el bloque de un proceso.
///
/// Orden fijo de líneas: puertos, proceso, PID, comando, directorio,
/// protocolos, estados, uptime y una línea en blanco. Las líneas de
/// puertos, protocolos y estados se omiten si su conjunto está vacío.
fn render_block(out: &mut String, summary: &ProcessSummary, now_secs: u64) {
    if !summary.ports.is_empty() {
        let ports: Vec<String> = summary
            .ports
            .iter()
            .map(|port| match summary.port_ips.get(port) {
                Some(ips) if !ips.is_empty() => {
                    let joined: Vec<&str> = ips.iter().map(String::as_str).collect();
                    format!("{}({})", port, joined.join(","))
                }
                _ => port.to_string(),
            })
            .collect();
        out.push_str(&format!("Puerto {}\n", ports.join(", ")));
    }

    out.push_str(&format!("Proceso {}\n", summary.name));
    out.push_str(&format!("PID {}\n", summary.pid));
    out.push_str(&format!("Comando {}\n", summary.command));
    out.push_str(&format!("Directorio {}\n", summary.workdir));

    if !summary.protocols.is_empty() {
        let protocols: Vec<&str> = summary.protocols.iter().copied().collect();
        out.push_str(&format!("Protocolo {}\n", protocols.join(", ")));
    }

    if !summary.states.is_empty() {
        let states: Vec<&str> = summary.states.iter().map(String::as_str).collect();
        out.push_str(&format!("Estado {}\n", states.join(", ")));
    }

    let elapsed = now_secs.saturating_sub(summary.started_secs);
    out.push_str(&format!("Iniciado {}\n", format_uptime(elapsed)));

    out.push('\n');
}

/// Formatea un tiempo transcurrido como "2h", "1h 30m" o "45m".
///
/// Con al menos una hora completa se emite "<H>h", seguido de " <M>m"
/// solo si el resto de minutos no es cero. Con menos de una hora se
/// emiten solo los minutos, incluido "0m".
///
/// # Arguments
/// * `elapsed_secs` - Segundos transcurridos desde el inicio del proceso
pub fn format_uptime(elapsed_secs: u64) -> String {
    let hours = elapsed_secs / 3600;
    let minutes = (elapsed_secs % 3600) / 60;

    if hours > 0 {
        if minutes > 0 {
            format!("{hours}h {minutes}m")
        } else {
            format!("{hours}h")
        }
    } else {
        format!("{minutes}m")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::aggregate_by_process;
    use crate::process_info::ProcessDetails;
    use crate::socket_scanner::{ConnectionInfo, Protocol};
    use std::collections::{BTreeMap, BTreeSet};

    fn summary_base() -> ProcessSummary {
        ProcessSummary {
            name: "srv".to_string(),
            pid: 100,
            command: "srv --port 8080".to_string(),
            workdir: "/app".to_string(),
            started_secs: 0,
            protocols: BTreeSet::new(),
            states: BTreeSet::new(),
            ports: BTreeSet::new(),
            port_ips: BTreeMap::new(),
        }
    }

    /// Verifica los tres formatos de uptime y el redondeo por truncado
    #[test]
    fn test_format_uptime() {
        assert_eq!(format_uptime(90 * 60), "1h 30m");
        assert_eq!(format_uptime(45 * 60), "45m");
        assert_eq!(format_uptime(2 * 3600), "2h");
        assert_eq!(format_uptime(0), "0m");
        assert_eq!(format_uptime(59), "0m");
        assert_eq!(format_uptime(3661), "1h 1m");
        // 89m59s trunca a 1h 29m, nunca redondea hacia arriba
        assert_eq!(format_uptime(89 * 60 + 59), "1h 29m");
    }

    /// Verifica el orden ascendente de puertos y de IPs dentro de un puerto
    #[test]
    fn test_ports_and_ips_sorted() {
        let mut summary = summary_base();
        summary.ports.extend([9090, 80, 8080]);
        summary.port_ips.insert(
            8080,
            ["[::]".to_string(), "10.0.0.5".to_string(), "0.0.0.0".to_string()]
                .into_iter()
                .collect(),
        );
        summary
            .port_ips
            .insert(80, ["127.0.0.1".to_string()].into_iter().collect());
        summary.port_ips.insert(9090, BTreeSet::new());

        let mut out = String::new();
        render_block(&mut out, &summary, 0);

        let port_line = out.lines().next().unwrap();
        assert_eq!(
            port_line,
            "Puerto 80(127.0.0.1), 8080(0.0.0.0,10.0.0.5,[::]), 9090"
        );
    }

    /// Verifica que las líneas con conjuntos vacíos se omiten
    #[test]
    fn test_empty_sets_omit_lines() {
        let summary = summary_base();

        let mut out = String::new();
        render_block(&mut out, &summary, 0);

        assert!(!out.contains("Puerto"));
        assert!(!out.contains("Protocolo"));
        assert!(!out.contains("Estado"));
        assert!(out.contains("Proceso srv\n"));
        assert!(out.contains("PID 100\n"));
        assert!(out.contains("Comando srv --port 8080\n"));
        assert!(out.contains("Directorio /app\n"));
        assert!(out.contains("Iniciado 0m\n"));
    }

    /// Verifica el escenario completo: agregar y renderizar un proceso
    #[test]
    fn test_end_to_end_report() {
        let connections = vec![
            ConnectionInfo {
                protocol: Protocol::Tcp,
                state: "LISTEN".to_string(),
                local_ip: "0.0.0.0".to_string(),
                local_port: 8080,
                remote_ip: None,
                remote_port: None,
                pid: 100,
            },
            ConnectionInfo {
                protocol: Protocol::Tcp,
                state: "LISTEN".to_string(),
                local_ip: "0.0.0.0".to_string(),
                local_port: 8080,
                remote_ip: None,
                remote_port: None,
                pid: 100,
            },
        ];

        let started = 10_000;
        let now = started + 65 * 60;

        let summaries = aggregate_by_process(
            &connections,
            |pid| {
                Ok::<_, String>(ProcessDetails {
                    pid,
                    name: "srv".to_string(),
                    command: "srv --port 8080".to_string(),
                    workdir: "/app".to_string(),
                    started_secs: started,
                })
            },
            "80",
        );

        let report = render_report(&summaries, now);

        let expected = "Puerto 8080(0.0.0.0)\n\
                        Proceso srv\n\
                        PID 100\n\
                        Comando srv --port 8080\n\
                        Directorio /app\n\
                        Protocolo TCP\n\
                        Estado LISTEN\n\
                        Iniciado 1h 5m\n\
                        \n\
                        Total: 1 procesos encontrados\n";
        assert_eq!(report, expected);
    }

    /// Verifica que los bloques salen en orden de PID ascendente
    #[test]
    fn test_blocks_in_pid_order() {
        let mut summaries = BTreeMap::new();
        for pid in [300, 100, 200] {
            let mut summary = summary_base();
            summary.pid = pid;
            summary.name = format!("proc{pid}");
            summaries.insert(pid, summary);
        }

        let report = render_report(&summaries, 0);

        let p100 = report.find("PID 100").unwrap();
        let p200 = report.find("PID 200").unwrap();
        let p300 = report.find("PID 300").unwrap();
        assert!(p100 < p200 && p200 < p300);
    }

    /// Verifica la línea de total con un mapa vacío
    #[test]
    fn test_total_line_for_empty_map() {
        let report = render_report(&BTreeMap::new(), 0);
        assert_eq!(report, "Total: 0 procesos encontrados\n");
    }
}
