use super::HandlerContext;
use crate::cli::DirectoryCommands;
use crate::cli::output::OutputFormatter;
use crate::core::DepartmentId;
use crate::error::Result;
use crate::storage::{NewEmployee, NewProvider};

pub async fn handle_directory_command(
    ctx: &HandlerContext,
    command: DirectoryCommands,
    output: &OutputFormatter,
) -> Result<()> {
    match command {
        DirectoryCommands::AddDepartment { name, category } => {
            let id = ctx.directory.add_department(&name, &category).await?;
            report_created(output, "department", id.get(), &name)
        },
        DirectoryCommands::AddDeviceType { name } => {
            let id = ctx.directory.add_device_type(&name).await?;
            report_created(output, "device type", id.get(), &name)
        },
        DirectoryCommands::AddEmployee {
            email,
            first_name,
            last_name,
            department,
            phone,
        } => {
            let (user_id, employee_id) = ctx
                .directory
                .add_employee(&NewEmployee {
                    email: email.clone(),
                    first_name,
                    last_name,
                    contact_number: phone,
                    department_id: DepartmentId(department),
                })
                .await?;
            if output.is_json() {
                output.print_json(&serde_json::json!({
                    "status": "success",
                    "user_id": user_id,
                    "employee_id": employee_id,
                }))
            } else {
                output.success(&format!(
                    "Added employee {email} (employee {employee_id}, user {user_id})"
                ));
                Ok(())
            }
        },
        DirectoryCommands::AddProvider {
            email,
            name,
            specialization,
            max_tickets,
        } => {
            let (user_id, provider_id) = ctx
                .directory
                .add_provider(&NewProvider {
                    email,
                    provider_name: name.clone(),
                    specialization,
                    max_concurrent_tickets: max_tickets,
                })
                .await?;
            if output.is_json() {
                output.print_json(&serde_json::json!({
                    "status": "success",
                    "user_id": user_id,
                    "provider_id": provider_id,
                }))
            } else {
                output.success(&format!(
                    "Added provider {name} (provider {provider_id}, user {user_id})"
                ));
                Ok(())
            }
        },
        DirectoryCommands::AddAdmin { email } => {
            let user_id = ctx.directory.add_admin(&email).await?;
            report_created(output, "admin", user_id.get(), &email)
        },
        DirectoryCommands::DeviceTypes => {
            let types = ctx.directory.device_types().await?;
            if output.is_json() {
                return output.print_json(&types);
            }
            for device_type in &types {
                output.info(&format!("{:<4} {}", device_type.id, device_type.type_name));
            }
            Ok(())
        },
        DirectoryCommands::Providers { available } => {
            let providers = if available {
                ctx.directory.available_providers().await?
            } else {
                ctx.directory.providers().await?
            };
            if output.is_json() {
                output.print_json(&providers)
            } else {
                output.providers(&providers);
                Ok(())
            }
        },
    }
}

fn report_created(output: &OutputFormatter, kind: &str, id: i64, name: &str) -> Result<()> {
    if output.is_json() {
        output.print_json(&serde_json::json!({ "status": "success", "id": id }))
    } else {
        output.success(&format!("Added {kind} {name} (id {id})"));
        Ok(())
    }
}
