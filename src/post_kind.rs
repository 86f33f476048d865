//! Selection of a post processor by name.

use serde::Deserialize;

use crate::abb_rapid::AbbRapid;
use crate::fanuc_tp::FanucTp;
use crate::kuka_krl::KukaKrl;
use crate::motoman_inform::MotomanInform;
use crate::post_settings::PostSettings;
use crate::post_traits::RobotPost;
use crate::sinumerik::Sinumerik;
use crate::ur_script::UrScript;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[cfg_attr(feature = "allow_filesystem", derive(clap::ValueEnum))]
#[serde(rename_all = "snake_case")]
pub enum PostKind {
    AbbRapid,
    KukaKrl,
    FanucTp,
    MotomanInform,
    UrScript,
    Sinumerik,
}

impl PostKind {
    pub const ALL: [PostKind; 6] = [
        PostKind::AbbRapid,
        PostKind::KukaKrl,
        PostKind::FanucTp,
        PostKind::MotomanInform,
        PostKind::UrScript,
        PostKind::Sinumerik,
    ];

    /// New post of this kind, configured by `settings`.
    pub fn create(&self, settings: &PostSettings) -> Box<dyn RobotPost> {
        match self {
            PostKind::AbbRapid => Box::new(AbbRapid::new(settings)),
            PostKind::KukaKrl => Box::new(KukaKrl::new(settings)),
            PostKind::FanucTp => Box::new(FanucTp::new(settings)),
            PostKind::MotomanInform => Box::new(MotomanInform::new(settings)),
            PostKind::UrScript => Box::new(UrScript::new(settings)),
            PostKind::Sinumerik => Box::new(Sinumerik::new(settings)),
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            PostKind::AbbRapid => "ABB IRC5 RAPID module (.mod)",
            PostKind::KukaKrl => "KUKA KRC4 KRL (.src)",
            PostKind::FanucTp => "Fanuc R-30iB TP, ASCII (.LS), paginated",
            PostKind::MotomanInform => "Yaskawa Motoman INFORM job (.JBI), paginated",
            PostKind::UrScript => "Universal Robots URScript (.script), can be sent to the robot",
            PostKind::Sinumerik => "Siemens Sinumerik 840D G-code (.mpf / .spf)",
        }
    }
}
