use colored::*;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::io::{self, Write};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    println!("{}", "🚚 Fleet Manager Testing Tool".bright_blue().bold());
    println!("{}", "=====================================".bright_blue());
    println!();

    let base_url = std::env::var("FLEET_API_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());
    let client = Client::new();
    println!("{} {}", "🌐 API:".bright_blue(), base_url);

    check_health(&client, &base_url).await?;

    loop {
        println!();
        println!("{}", "📋 MENÚ PRINCIPAL".bright_green().bold());
        println!("{}", "==================".bright_green());
        println!("1. ⛽ Solicitud de combustible: owner crea, manager aprueba");
        println!("2. 📜 Ver auditoría de una entidad");
        println!("3. 🚪 Salir");
        print!("{}", "Selecciona una opción (1-3): ".bright_yellow());
        io::stdout().flush()?;

        let mut choice = String::new();
        io::stdin().read_line(&mut choice)?;

        match choice.trim() {
            "1" => {
                if let Err(e) = fuel_request_flow(&client, &base_url).await {
                    println!("{} {}", "❌".bright_red(), e);
                }
            }
            "2" => {
                if let Err(e) = show_audit(&client, &base_url).await {
                    println!("{} {}", "❌".bright_red(), e);
                }
            }
            "3" => {
                println!("{}", "👋 ¡Hasta luego!".bright_green());
                break;
            }
            _ => {
                println!("{}", "❌ Opción inválida. Intenta de nuevo.".bright_red());
            }
        }
    }

    Ok(())
}

fn prompt(label: &str) -> anyhow::Result<String> {
    print!("{}", label.bright_yellow());
    io::stdout().flush()?;
    let mut value = String::new();
    io::stdin().read_line(&mut value)?;
    Ok(value.trim().to_string())
}

async fn check_health(client: &Client, base_url: &str) -> anyhow::Result<()> {
    let response = client.get(format!("{}/health", base_url)).send().await?;
    let status = response.status();
    let body: Value = response.json().await?;
    if status == StatusCode::OK {
        println!("{} {}", "✅ Health:".bright_green(), body["status"]);
    } else {
        println!("{} {}", "⚠️ Health:".bright_red(), serde_json::to_string_pretty(&body)?);
    }
    Ok(())
}

async fn login(client: &Client, base_url: &str, who: &str) -> anyhow::Result<String> {
    println!();
    println!("{}", format!("🔐 LOGIN ({})", who).bright_cyan().bold());
    let email = prompt("Email: ")?;
    let password = prompt("Password: ")?;

    let response = client
        .post(format!("{}/auth/login", base_url))
        .json(&json!({ "email": email, "password": password }))
        .send()
        .await?;
    let status = response.status();
    let body: Value = response.json().await?;
    if !status.is_success() {
        anyhow::bail!("login falló ({}): {}", status, body["message"]);
    }

    let token = body["data"]["token"]
        .as_str()
        .ok_or_else(|| anyhow::anyhow!("respuesta de login sin token"))?
        .to_string();
    println!("{} {}", "✅ Autenticado como".bright_green(), body["data"]["user"]["role"]);
    Ok(token)
}

async fn call(
    client: &Client,
    method: reqwest::Method,
    url: String,
    token: &str,
    body: Option<Value>,
) -> anyhow::Result<Value> {
    println!("{} {} {}", "📤".bright_blue(), method, url);
    let mut request = client.request(method, &url).bearer_auth(token);
    if let Some(body) = body {
        println!("{}", serde_json::to_string_pretty(&body)?);
        request = request.json(&body);
    }

    let response = request.send().await?;
    let status = response.status();
    let body: Value = response.json().await?;
    println!("{} {}", "📥 Status:".bright_blue(), status);
    if !status.is_success() {
        anyhow::bail!("{} {}: {}", status, body["code"], body["message"]);
    }
    Ok(body)
}

async fn fuel_request_flow(client: &Client, base_url: &str) -> anyhow::Result<()> {
    let owner_token = login(client, base_url, "owner").await?;

    let vehicles = call(client, reqwest::Method::GET, format!("{}/vehicles", base_url), &owner_token, None).await?;
    let vehicle = vehicles["data"]["items"]
        .as_array()
        .and_then(|items| items.first())
        .ok_or_else(|| anyhow::anyhow!("el owner no tiene vehículos registrados"))?;
    println!(
        "{} {} ({})",
        "🚗 Vehículo:".bright_green(),
        vehicle["plate_number"],
        vehicle["condition"]
    );

    let litres = prompt("Litros: ")?;
    let litres: f64 = litres.parse()?;
    let created = call(
        client,
        reqwest::Method::POST,
        format!("{}/requests/fuel", base_url),
        &owner_token,
        Some(json!({
            "vehicle_id": vehicle["id"],
            "quantity_litres": litres,
            "reason": "Prueba desde testing-tool"
        })),
    )
    .await?;
    let id = created["data"]["id"]
        .as_str()
        .ok_or_else(|| anyhow::anyhow!("respuesta sin id"))?
        .to_string();
    println!("{} {} ({})", "✅ Creada".bright_green(), id, created["data"]["status"]);

    let manager_token = login(client, base_url, "manager").await?;
    let approved = call(
        client,
        reqwest::Method::PATCH,
        format!("{}/requests/fuel/{}", base_url, id),
        &manager_token,
        Some(json!({ "status": "approved", "expectedCurrentStatus": "pending" })),
    )
    .await?;
    println!("{} {}", "✅ Estado final:".bright_green(), approved["data"]["status"]);

    // Repetir la misma transición debe dar 409
    let retry = call(
        client,
        reqwest::Method::PATCH,
        format!("{}/requests/fuel/{}", base_url, id),
        &manager_token,
        Some(json!({ "status": "approved", "expectedCurrentStatus": "pending" })),
    )
    .await;
    match retry {
        Err(e) => println!("{} {}", "✅ Reintento rechazado:".bright_green(), e),
        Ok(_) => println!("{}", "⚠️ El reintento no fue rechazado".bright_red()),
    }

    Ok(())
}

async fn show_audit(client: &Client, base_url: &str) -> anyhow::Result<()> {
    let token = login(client, base_url, "auditor o admin").await?;
    let entity_type = prompt("Tipo (FuelRequest, MaintenanceRequest, ConditionUpdate, Vehicle, User): ")?;
    let entity_id = prompt("Id de entidad (vacío para todas): ")?;

    let mut url = format!("{}/audit?type={}&per_page=20", base_url, entity_type);
    if !entity_id.is_empty() {
        url.push_str(&format!("&entity_id={}", entity_id));
    }

    let page = call(client, reqwest::Method::GET, url, &token, None).await?;
    let entries = page["data"]["entries"].as_array().cloned().unwrap_or_default();
    println!();
    println!("{} {}", "📜 Entradas:".bright_cyan().bold(), page["data"]["total"]);
    for entry in entries {
        println!(
            "  {} {} {} {} by {} ({})",
            entry["created_at"].as_str().unwrap_or_default().dimmed(),
            entry["entity_type"],
            entry["entity_id"],
            entry["action"].as_str().unwrap_or_default().bright_yellow(),
            entry["actor_id"],
            entry["actor_role"]
        );
    }
    Ok(())
}
