pub const SIGN_IN_SUBJECT: &str = "Sign in to JUNE 🌞";
pub const WELCOME_SUBJECT: &str = "Welcome to JUNE 🌞";

pub fn sign_in_html(link: &str) -> String {
    format!(
        r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin:auto; padding: 20px; background: #f5f5f5;">
  <div style="background: linear-gradient(135deg, #004499, #ff7733); padding: 30px; border-radius: 10px; color: white; text-align:center;">
    <h1>Welcome to JUNE</h1>
    <p>Your money's new season begins here.</p>
  </div>
  <div style="padding: 20px; text-align:center; background:white; border-radius: 8px; margin-top:20px;">
    <h2>Hey there 👋</h2>
    <p>Click below to securely verify your email and sign in:</p>
    <a href="{link}" style="display:inline-block; margin-top:20px; padding:12px 24px; background:#004499; color:white; text-decoration:none; border-radius:6px;">Verify &amp; Join JUNE</a>
  </div>
  <p style="font-size:12px; color:#666; margin-top:30px; text-align:center;">
    If you didn't request this, please ignore this email.
  </p>
</div>"#
    )
}

pub fn welcome_html(referral_code: &str, site_url: &str) -> String {
    format!(
        r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin:auto; padding: 20px; background: #f5f5f5;">
  <div style="background: linear-gradient(135deg, #004499, #ff7733); padding: 30px; border-radius: 10px; color: white; text-align:center;">
    <h1>You're in early, welcome to June 🌞</h1>
    <p>You've joined a new kind of savings movement.</p>
  </div>
  <div style="padding: 20px; text-align:center; background:white; border-radius: 8px; margin-top:20px;">
    <h2>Hey there 👋</h2>
    <p>Thanks for verifying your email! You're officially part of JUNE's early access list.</p>
    <p>Each person who joins with your code moves you closer to priority early access when June launches.</p>
    <div style="margin: 30px 0; padding: 20px; background: #f0f7ff; border-radius: 8px; border: 2px dashed #004499;">
      <p style="margin: 0 0 10px 0; color: #666; font-size: 14px;">Your unique referral code:</p>
      <p style="margin: 0; font-size: 24px; font-weight: bold; color: #004499; letter-spacing: 2px;">{referral_code}</p>
      <p style="margin: 15px 0 0 0; color: #666; font-size: 14px;">Share this code with friends and climb the leaderboard! 🚀</p>
    </div>
    <a href="{site_url}" style="display:inline-block; margin-top:20px; padding:12px 24px; background:#004499; color:white; text-decoration:none; border-radius:6px;">Visit Our Site</a>
  </div>
</div>"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_in_mail_embeds_link() {
        let html = sign_in_html("https://june.money/verify?token=abc");
        assert!(html.contains(r#"href="https://june.money/verify?token=abc""#));
    }

    #[test]
    fn welcome_mail_embeds_code_and_site() {
        let html = welcome_html("JUNE-AB12C3", "https://june.money/");
        assert!(html.contains("JUNE-AB12C3"));
        assert!(html.contains(r#"href="https://june.money/""#));
    }
}
