//! HTML bodies for participant notifications and the organizer summary.

use htmlescape::encode_minimal as escape;

use crate::config::EventConfig;
use crate::ledger::LedgerEntry;

pub fn notification_html(event: &EventConfig, giver_name: &str, receiver_name: &str) -> String {
    let title = escape(&event.title);
    let organization = escape(&event.organization);
    let giver = escape(giver_name);
    let receiver = escape(receiver_name);
    let budget_tip = event
        .gift_budget
        .as_deref()
        .map(|budget| {
            format!(
                "<li>El valor sugerido del regalo es alrededor de {}</li>",
                escape(budget)
            )
        })
        .unwrap_or_default();
    format!(
        r#"<!DOCTYPE html>
<html lang="es">
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>{title}</title>
</head>
<body style="margin: 0; padding: 0; font-family: 'Segoe UI', Tahoma, Geneva, Verdana, sans-serif; background-color: #f4f4f4;">
  <table width="100%" cellpadding="0" cellspacing="0" style="background-color: #f4f4f4; padding: 20px 0;">
    <tr>
      <td align="center">
        <table width="600" cellpadding="0" cellspacing="0" style="background-color: #ffffff; border-radius: 12px; overflow: hidden;">
          <tr>
            <td style="background: linear-gradient(135deg, #667eea 0%, #764ba2 100%); padding: 40px 30px; text-align: center;">
              <h1 style="color: #ffffff; margin: 0; font-size: 32px;">🎁 {title} 🎁</h1>
              <p style="color: #ffffff; margin: 10px 0 0 0; font-size: 16px;">¡Ha llegado el momento mágico!</p>
            </td>
          </tr>
          <tr>
            <td style="padding: 40px 30px;">
              <p style="color: #333333; font-size: 18px; margin: 0 0 20px 0;">Hola <strong style="color: #667eea;">{giver}</strong>,</p>
              <p style="color: #555555; font-size: 16px; line-height: 1.8; margin: 0 0 30px 0;">
                ¡Es oficial! El sorteo ha sido realizado y ya tienes asignada a tu persona especial.
                Recuerda que esto es un secreto y la magia está en mantener la sorpresa hasta el gran día. 🤫
              </p>
              <table width="100%" cellpadding="0" cellspacing="0" style="background: linear-gradient(135deg, #f093fb 0%, #f5576c 100%); border-radius: 10px; margin: 30px 0;">
                <tr>
                  <td style="padding: 30px; text-align: center;">
                    <p style="color: #3C4442; font-size: 14px; margin: 0 0 10px 0; text-transform: uppercase; letter-spacing: 2px;">Tu amigo secreto es</p>
                    <p style="color: #6C9E3C; font-size: 28px; font-weight: bold; margin: 0;">{receiver}</p>
                  </td>
                </tr>
              </table>
              <div style="background-color: #f8f9fa; border-left: 4px solid #667eea; padding: 20px; margin: 30px 0;">
                <p style="color: #333333; font-size: 15px; font-weight: bold; margin: 0 0 10px 0;">💡 Consejos para un regalo perfecto:</p>
                <ul style="color: #555555; font-size: 14px; line-height: 1.8; margin: 0; padding-left: 20px;">
                  <li>Piensa en sus gustos e intereses</li>
                  <li>No es necesario gastar mucho, lo importante es el detalle</li>
                  <li>Un toque personal hace la diferencia</li>
                  {budget_tip}
                  <li>¡Mantén el secreto hasta el final! 🤐</li>
                </ul>
              </div>
              <p style="color: #555555; font-size: 15px; margin: 30px 0 0 0; text-align: center;">¡Que comience la diversión! 🎉</p>
            </td>
          </tr>
          <tr>
            <td style="background-color: #f8f9fa; padding: 25px 30px; text-align: center; border-top: 1px solid #e9ecef;">
              <p style="color: #6c757d; font-size: 13px; margin: 0; line-height: 1.6;">
                Este correo es confidencial. Por favor, no compartas esta información con nadie.<br>
                <strong>{organization}</strong> | {title}
              </p>
            </td>
          </tr>
        </table>
      </td>
    </tr>
  </table>
</body>
</html>
"#
    )
}

pub fn ledger_subject(event: &EventConfig, entry: &LedgerEntry) -> String {
    let marker = if entry.dry_run { "[SIMULACIÓN] " } else { "" };
    format!("{marker}📋 Log {} - {}", event.title, entry.display_date)
}

/// Confidential organizer summary: totals plus the full giver → receiver table.
pub fn ledger_html(event: &EventConfig, entry: &LedgerEntry, sent: usize, failed: usize) -> String {
    let title = escape(&event.title);
    let organization = escape(&event.organization);
    let display_date = escape(&entry.display_date);
    let total = entry.total;
    let rows: String = entry
        .assignments
        .iter()
        .enumerate()
        .map(|(i, a)| {
            format!(
                r#"
                  <tr style="border-bottom: 1px solid #e9ecef;">
                    <td style="padding: 12px 15px; text-align: center; color: #6c757d;">{n}</td>
                    <td style="padding: 12px 15px; color: #333;">{giver}</td>
                    <td style="padding: 12px 15px; text-align: center; color: #667eea;">→</td>
                    <td style="padding: 12px 15px; color: #333;">{receiver}</td>
                    <td style="padding: 12px 15px; color: #6c757d;">{email}</td>
                  </tr>"#,
                n = i + 1,
                giver = escape(&a.giver),
                receiver = escape(&a.receiver),
                email = escape(&a.email),
            )
        })
        .collect();
    format!(
        r#"<!DOCTYPE html>
<html lang="es">
<head>
  <meta charset="UTF-8">
  <title>Log {title}</title>
</head>
<body style="margin: 0; padding: 0; font-family: 'Segoe UI', Tahoma, Geneva, Verdana, sans-serif; background-color: #f4f4f4;">
  <table width="100%" cellpadding="0" cellspacing="0" style="background-color: #f4f4f4; padding: 20px 0;">
    <tr>
      <td align="center">
        <table width="800" cellpadding="0" cellspacing="0" style="background-color: #ffffff; border-radius: 12px; overflow: hidden;">
          <tr>
            <td style="background: linear-gradient(135deg, #667eea 0%, #764ba2 100%); padding: 30px; text-align: center;">
              <h1 style="color: #ffffff; margin: 0; font-size: 28px;">📋 Log de Asignaciones - {title}</h1>
              <p style="color: #ffffff; margin: 10px 0 0 0; font-size: 14px;">{display_date}</p>
            </td>
          </tr>
          <tr>
            <td style="padding: 30px;">
              <table width="100%" cellpadding="0" cellspacing="0" style="margin-bottom: 30px;">
                <tr>
                  <td style="text-align: center; padding: 10px;">Total Asignaciones<br><strong style="font-size: 32px;">{total}</strong></td>
                  <td style="text-align: center; padding: 10px;">Enviados<br><strong style="font-size: 32px;">{sent}</strong></td>
                  <td style="text-align: center; padding: 10px;">Fallidos<br><strong style="font-size: 32px;">{failed}</strong></td>
                </tr>
              </table>
              <h2 style="color: #333; font-size: 20px; margin: 0 0 20px 0;">Detalle de Asignaciones</h2>
              <table width="100%" cellpadding="0" cellspacing="0" style="border: 1px solid #e9ecef;">
                <thead>
                  <tr style="background-color: #f8f9fa;">
                    <th style="padding: 15px;">#</th>
                    <th style="padding: 15px; text-align: left;">Quien da</th>
                    <th style="padding: 15px;"></th>
                    <th style="padding: 15px; text-align: left;">Le toca</th>
                    <th style="padding: 15px; text-align: left;">Email</th>
                  </tr>
                </thead>
                <tbody>{rows}
                </tbody>
              </table>
              <div style="background-color: #fff3cd; border-left: 4px solid #ffc107; padding: 15px; margin-top: 30px;">
                <p style="color: #856404; margin: 0; font-size: 13px; line-height: 1.6;">
                  <strong>⚠️ Confidencial:</strong> Este correo contiene información sensible sobre las asignaciones.
                  Por favor, no compartir esta información con ningún participante para mantener la sorpresa.
                </p>
              </div>
            </td>
          </tr>
          <tr>
            <td style="background-color: #f8f9fa; padding: 20px; text-align: center; border-top: 1px solid #e9ecef;">
              <p style="color: #6c757d; font-size: 12px; margin: 0;">
                <strong>{organization}</strong> | {title}<br>
                Log generado automáticamente el {display_date}
              </p>
            </td>
          </tr>
        </table>
      </td>
    </tr>
  </table>
</body>
</html>
"#
    )
}
