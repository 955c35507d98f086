//! Well-known component names, grouped for selection, and the record of
//! what a prefix already has installed

use std::fs;
use std::path::Path;

/// Log the component installer appends to inside each prefix
pub const INSTALL_LOG: &str = "winetricks.log";

/// A titled set of component names
#[derive(Debug, Clone, Copy)]
pub struct ComponentGroup {
    pub title: &'static str,
    pub components: &'static [&'static str],
}

pub const COMPONENT_GROUPS: &[ComponentGroup] = &[
    ComponentGroup {
        title: "Visual Basic runtimes",
        components: &["vb2run", "vb3run", "vb4run", "vb5run", "vb6run"],
    },
    ComponentGroup {
        title: "Visual C++ runtimes",
        components: &[
            "vcrun6", "vcrun6sp6", "vcrun2003", "vcrun2005", "vcrun2008", "vcrun2010",
            "vcrun2012", "vcrun2013", "vcrun2015", "vcrun2017", "vcrun2019", "vcrun2022",
        ],
    },
    ComponentGroup {
        title: ".NET Framework",
        components: &[
            "dotnet11", "dotnet11sp1", "dotnet20", "dotnet20sp1", "dotnet20sp2", "dotnet30",
            "dotnet30sp1", "dotnet35", "dotnet35sp1", "dotnet40", "dotnet40_kb2468871",
            "dotnet45", "dotnet452", "dotnet46", "dotnet461", "dotnet462", "dotnet471",
            "dotnet472", "dotnet48", "dotnet6", "dotnet7", "dotnet8", "dotnet9",
            "dotnetcore2", "dotnetcore3", "dotnetcoredesktop3", "dotnetdesktop6",
            "dotnetdesktop7", "dotnetdesktop8", "dotnetdesktop9",
        ],
    },
    ComponentGroup {
        title: "DirectX and multimedia",
        components: &[
            "d3dcompiler_42", "d3dcompiler_43", "d3dcompiler_46", "d3dcompiler_47", "d3dx9",
            "d3dx9_24", "d3dx9_25", "d3dx9_26", "d3dx9_27", "d3dx9_28", "d3dx9_29",
            "d3dx9_30", "d3dx9_31", "d3dx9_32", "d3dx9_33", "d3dx9_34", "d3dx9_35",
            "d3dx9_36", "d3dx9_37", "d3dx9_38", "d3dx9_39", "d3dx9_40", "d3dx9_41",
            "d3dx9_42", "d3dx9_43", "d3dx10", "d3dx10_43", "d3dx11_42", "d3dx11_43",
            "d3dxof", "devenum", "dinput", "dinput8", "directmusic", "directplay",
            "directshow", "directx9", "dmband", "dmcompos", "dmime", "dmloader", "dmscript",
            "dmstyle", "dmsynth", "dmusic", "dmusic32", "dx8vb", "dxdiag", "dxdiagn",
            "dxdiagn_feb2010", "dxtrans", "xact", "xact_x64", "xaudio29", "xinput", "xna31",
            "xna40",
        ],
    },
    ComponentGroup {
        title: "DXVK and VKD3D",
        components: &[
            "dxvk", "dxvk1000", "dxvk1001", "dxvk1002", "dxvk1003", "dxvk1011", "dxvk1020",
            "dxvk1021", "dxvk1022", "dxvk1023", "dxvk1030", "dxvk1031", "dxvk1032",
            "dxvk1033", "dxvk1034", "dxvk1040", "dxvk1041", "dxvk1042", "dxvk1043",
            "dxvk1044", "dxvk1045", "dxvk1046", "dxvk1050", "dxvk1051", "dxvk1052",
            "dxvk1053", "dxvk1054", "dxvk1055", "dxvk1060", "dxvk1061", "dxvk1070",
            "dxvk1071", "dxvk1072", "dxvk1073", "dxvk1080", "dxvk1081", "dxvk1090",
            "dxvk1091", "dxvk1092", "dxvk1093", "dxvk1094", "dxvk1100", "dxvk1101",
            "dxvk1102", "dxvk1103", "dxvk2000", "dxvk2010", "dxvk2020", "dxvk2030",
            "dxvk2040", "dxvk2041", "dxvk2050", "dxvk2051", "dxvk2052", "dxvk2053",
            "dxvk2060", "dxvk2061", "dxvk2062", "vkd3d",
        ],
    },
    ComponentGroup {
        title: "Multimedia codecs",
        components: &[
            "allcodecs", "avifil32", "binkw32", "cinepak", "dirac", "ffdshow", "icodecs",
            "l3codecx", "lavfilters", "lavfilters702", "ogg", "qasf", "qcap", "qdvd",
            "qedit", "quartz", "quartz_feb2010", "quicktime72", "quicktime76", "wmp9",
            "wmp10", "wmp11", "wmv9vcm", "xvid",
        ],
    },
    ComponentGroup {
        title: "System components",
        components: &[
            "amstream", "atmlib", "cabinet", "cmd", "comctl32", "comctl32ocx", "comdlg32ocx",
            "crypt32", "crypt32_winxp", "dbghelp", "esent", "filever", "gdiplus",
            "gdiplus_winxp", "glidewrapper", "glut", "gmdls", "hid", "jet40", "mdac27",
            "mdac28", "msaa", "msacm32", "msasn1", "msctf", "msdelta", "msdxmocx",
            "msflxgrd", "msftedit", "mshflxgd", "msls31", "msmask", "mspatcha", "msscript",
            "msvcirt", "msvcrt40", "msxml3", "msxml4", "msxml6", "ole32", "oleaut32", "pdh",
            "pdh_nt4", "peverify", "pngfilt", "prntvpt", "python26", "python27", "riched20",
            "riched30", "richtx32", "sapi", "sdl", "secur32", "setupapi", "shockwave",
            "speechsdk", "tabctl32", "ucrtbase2019", "uiribbon", "updspapi", "urlmon",
            "usp10", "webio", "windowscodecs", "winhttp", "wininet", "wininet_win2k", "wmi",
            "wsh57", "xmllite",
        ],
    },
    ComponentGroup {
        title: "Drivers and utilities",
        components: &[
            "art2k7min", "art2kmin", "cnc_ddraw", "d2gl", "d3drm", "dpvoice", "dsdmo",
            "dsound", "dswave", "faudio", "faudio1901", "faudio1902", "faudio1903",
            "faudio1904", "faudio1905", "faudio1906", "faudio190607", "galliumnine",
            "galliumnine02", "galliumnine03", "galliumnine04", "galliumnine05",
            "galliumnine06", "galliumnine07", "galliumnine08", "galliumnine09", "gfw", "ie6",
            "ie7", "ie8", "ie8_kb2936068", "ie8_tls12", "iertutil", "itircl", "itss", "mdx",
            "mf", "mfc40", "mfc42", "mfc70", "mfc71", "mfc80", "mfc90", "mfc100", "mfc110",
            "mfc120", "mfc140", "nuget", "openal", "otvdm", "otvdm090", "physx",
            "powershell", "powershell_core",
        ],
    },
];

/// Find a group by title, ignoring case
pub fn find_group(title: &str) -> Option<&'static ComponentGroup> {
    COMPONENT_GROUPS
        .iter()
        .find(|g| g.title.eq_ignore_ascii_case(title))
}

/// Whether `name` appears in any group
pub fn is_known_component(name: &str) -> bool {
    COMPONENT_GROUPS
        .iter()
        .any(|g| g.components.contains(&name))
}

/// Components recorded in the prefix's install log.
///
/// Blank lines, comments, flags (`-q`, `--force`) and `key=value` commands
/// are skipped. A missing or unreadable log means nothing is installed.
pub fn installed_components(prefix: &Path) -> Vec<String> {
    let log_file = prefix.join(INSTALL_LOG);
    let content = match fs::read_to_string(&log_file) {
        Ok(content) => content,
        Err(_) => return Vec::new(),
    };

    content
        .lines()
        .map(str::trim)
        .filter(|line| {
            !line.is_empty()
                && !line.starts_with('#')
                && !line.starts_with('-')
                && !line.starts_with("//")
                && !line.contains('=')
        })
        .map(str::to_string)
        .collect()
}

/// Exact-name check against the install log
pub fn is_installed(prefix: &Path, component: &str) -> bool {
    installed_components(prefix).iter().any(|c| c == component)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_install_log() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(INSTALL_LOG),
            "# comment\nvcrun2019\n\n-q\narch=64\n  dotnet48  \nw_workaround=1\n",
        )
        .unwrap();

        assert_eq!(installed_components(dir.path()), ["vcrun2019", "dotnet48"]);
        assert!(is_installed(dir.path(), "dotnet48"));
        assert!(!is_installed(dir.path(), "dotnet"));
    }

    #[test]
    fn missing_log_means_nothing_installed() {
        let dir = tempfile::tempdir().unwrap();
        assert!(installed_components(dir.path()).is_empty());
    }

    #[test]
    fn groups_are_searchable() {
        assert!(find_group("dxvk and vkd3d").is_some());
        assert!(is_known_component("vcrun2022"));
        assert!(!is_known_component("not-a-component"));
    }
}
