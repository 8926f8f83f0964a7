//! Minimal PowerPoint writer.
//!
//! A PPTX file is a ZIP archive of Open XML parts. The deck written here has
//! one master, two layouts (title, title and content), one theme and one part
//! per slide. Shapes are positioned text boxes rather than layout
//! placeholders, so the layouts carry no geometry of their own.

use quick_xml::escape::escape;
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

pub const MIME: &str = "application/vnd.openxmlformats-officedocument.presentationml.presentation";

const EMU_PER_INCH: i64 = 914_400;
const SLIDE_WIDTH: i64 = 10 * EMU_PER_INCH;
const SLIDE_HEIGHT: i64 = 7 * EMU_PER_INCH + EMU_PER_INCH / 2;

/// Font sizes in hundredths of a point.
const TITLE_SIZE: u32 = 2000;
const TEXT_SIZE: u32 = 1400;
const TITLE_COLOR: &str = "0066CC";

const NS: &str = r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main""#;
const XML_DECL: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;
const REL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

#[derive(Debug, thiserror::Error)]
pub enum PptxError {
    #[error("Could not write slide deck: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("Could not write slide deck: {0}")]
    Io(#[from] std::io::Error),
    #[error("Unsupported slide image: {0}")]
    Image(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PictureFormat {
    Png,
    Jpeg,
}

impl PictureFormat {
    fn extension(self) -> &'static str {
        match self {
            PictureFormat::Png => "png",
            PictureFormat::Jpeg => "jpeg",
        }
    }

    pub fn mime(self) -> &'static str {
        match self {
            PictureFormat::Png => "image/png",
            PictureFormat::Jpeg => "image/jpeg",
        }
    }
}

/// A decoded-enough image: format and pixel size are needed for placement.
#[derive(Debug, Clone)]
pub struct Picture {
    bytes: Vec<u8>,
    format: PictureFormat,
    width: u32,
    height: u32,
}

impl Picture {
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, PptxError> {
        let format = match image::guess_format(&bytes) {
            Ok(image::ImageFormat::Png) => PictureFormat::Png,
            Ok(image::ImageFormat::Jpeg) => PictureFormat::Jpeg,
            Ok(other) => return Err(PptxError::Image(format!("{other:?} is not supported"))),
            Err(e) => return Err(PptxError::Image(e.to_string())),
        };
        let decoded = image::load_from_memory(&bytes).map_err(|e| PptxError::Image(e.to_string()))?;
        let (width, height) = (decoded.width(), decoded.height());
        if width == 0 || height == 0 {
            return Err(PptxError::Image("image has no pixels".into()));
        }
        Ok(Self {
            bytes,
            format,
            width,
            height,
        })
    }

    pub fn format(&self) -> PictureFormat {
        self.format
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Size in EMU for a picture `width` EMU wide, shrunk to fit `max_height`.
    fn extent(&self, width: i64, max_height: i64) -> (i64, i64) {
        let height = width * self.height as i64 / self.width as i64;
        if height <= max_height {
            (width, height)
        } else {
            (max_height * self.width as i64 / self.height as i64, max_height)
        }
    }
}

#[derive(Debug, Clone)]
pub struct Slide {
    pub title: String,
    pub body: String,
    pub picture: Option<Picture>,
}

#[derive(Debug, Clone)]
pub struct Deck {
    title: String,
    subtitle: String,
    slides: Vec<Slide>,
}

struct Rect {
    x: i64,
    y: i64,
    cx: i64,
    cy: i64,
}

impl Deck {
    pub fn new(title: impl Into<String>, subtitle: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            subtitle: subtitle.into(),
            slides: Vec::new(),
        }
    }

    pub fn push(&mut self, slide: Slide) {
        self.slides.push(slide);
    }

    /// Number of slides including the title slide.
    pub fn slide_count(&self) -> usize {
        self.slides.len() + 1
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, PptxError> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        let mut put = |name: &str, data: &[u8]| -> Result<(), PptxError> {
            zip.start_file(name, options)?;
            zip.write_all(data)?;
            Ok(())
        };

        put("[Content_Types].xml", self.content_types().as_bytes())?;
        put("_rels/.rels", ROOT_RELS.as_bytes())?;
        put("docProps/core.xml", self.core_props().as_bytes())?;
        put("docProps/app.xml", self.app_props().as_bytes())?;
        put("ppt/presentation.xml", self.presentation().as_bytes())?;
        put("ppt/_rels/presentation.xml.rels", self.presentation_rels().as_bytes())?;
        put("ppt/slideMasters/slideMaster1.xml", slide_master().as_bytes())?;
        put("ppt/slideMasters/_rels/slideMaster1.xml.rels", MASTER_RELS.as_bytes())?;
        put("ppt/slideLayouts/slideLayout1.xml", slide_layout("title", "Title Slide").as_bytes())?;
        put("ppt/slideLayouts/slideLayout2.xml", slide_layout("obj", "Title and Content").as_bytes())?;
        for n in 1..=2 {
            put(&format!("ppt/slideLayouts/_rels/slideLayout{n}.xml.rels"), LAYOUT_RELS.as_bytes())?;
        }
        put("ppt/theme/theme1.xml", THEME.as_bytes())?;

        put("ppt/slides/slide1.xml", self.title_slide().as_bytes())?;
        put("ppt/slides/_rels/slide1.xml.rels", &slide_rels(1, None).into_bytes())?;

        let mut media = 0;
        for (i, slide) in self.slides.iter().enumerate() {
            let n = i + 2;
            let image = match &slide.picture {
                Some(picture) => {
                    media += 1;
                    let name = format!("image{media}.{}", picture.format.extension());
                    put(&format!("ppt/media/{name}"), &picture.bytes)?;
                    Some(name)
                }
                None => None,
            };
            put(&format!("ppt/slides/slide{n}.xml"), content_slide(slide).as_bytes())?;
            put(
                &format!("ppt/slides/_rels/slide{n}.xml.rels"),
                slide_rels(2, image.as_deref()).as_bytes(),
            )?;
        }

        Ok(zip.finish()?.into_inner())
    }

    fn content_types(&self) -> String {
        let mut xml = format!(
            r#"{XML_DECL}<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Default Extension="png" ContentType="image/png"/><Default Extension="jpeg" ContentType="image/jpeg"/><Override PartName="/ppt/presentation.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml"/><Override PartName="/ppt/slideMasters/slideMaster1.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slideMaster+xml"/><Override PartName="/ppt/slideLayouts/slideLayout1.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slideLayout+xml"/><Override PartName="/ppt/slideLayouts/slideLayout2.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slideLayout+xml"/><Override PartName="/ppt/theme/theme1.xml" ContentType="application/vnd.openxmlformats-officedocument.theme+xml"/><Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/><Override PartName="/docProps/app.xml" ContentType="application/vnd.openxmlformats-officedocument.extended-properties+xml"/>"#
        );
        for n in 1..=self.slide_count() {
            xml.push_str(&format!(
                r#"<Override PartName="/ppt/slides/slide{n}.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slide+xml"/>"#
            ));
        }
        xml.push_str("</Types>");
        xml
    }

    fn core_props(&self) -> String {
        format!(
            r#"{XML_DECL}<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"><dc:title>{}</dc:title><dc:creator>Study Box</dc:creator></cp:coreProperties>"#,
            escape(self.title.as_str())
        )
    }

    fn app_props(&self) -> String {
        format!(
            r#"{XML_DECL}<Properties xmlns="http://schemas.openxmlformats.org/officeDocument/2006/extended-properties"><Application>Study Box</Application><Slides>{}</Slides></Properties>"#,
            self.slide_count()
        )
    }

    fn presentation(&self) -> String {
        let ids: String = (1..=self.slide_count())
            .map(|n| format!(r#"<p:sldId id="{}" r:id="rId{}"/>"#, 255 + n, n + 2))
            .collect();
        format!(
            r#"{XML_DECL}<p:presentation {NS}><p:sldMasterIdLst><p:sldMasterId id="2147483648" r:id="rId1"/></p:sldMasterIdLst><p:sldIdLst>{ids}</p:sldIdLst><p:sldSz cx="{SLIDE_WIDTH}" cy="{SLIDE_HEIGHT}" type="screen4x3"/><p:notesSz cx="6858000" cy="9144000"/></p:presentation>"#
        )
    }

    fn presentation_rels(&self) -> String {
        let mut xml = format!(
            r#"{XML_DECL}<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="{REL_NS}/slideMaster" Target="slideMasters/slideMaster1.xml"/><Relationship Id="rId2" Type="{REL_NS}/theme" Target="theme/theme1.xml"/>"#
        );
        for n in 1..=self.slide_count() {
            xml.push_str(&format!(
                r#"<Relationship Id="rId{}" Type="{REL_NS}/slide" Target="slides/slide{n}.xml"/>"#,
                n + 2
            ));
        }
        xml.push_str("</Relationships>");
        xml
    }

    fn title_slide(&self) -> String {
        let title = text_box(
            2,
            "Title",
            &Rect {
                x: 685_800,
                y: 2_130_425,
                cx: 7_772_400,
                cy: 1_470_025,
            },
            &self.title,
            TITLE_SIZE,
            Some(TITLE_COLOR),
        );
        let subtitle = text_box(
            3,
            "Subtitle",
            &Rect {
                x: 1_371_600,
                y: 3_886_200,
                cx: 6_400_800,
                cy: 1_752_600,
            },
            &self.subtitle,
            TEXT_SIZE,
            None,
        );
        slide_xml(&format!("{title}{subtitle}"))
    }
}

fn content_slide(slide: &Slide) -> String {
    let title = text_box(
        2,
        "Title",
        &Rect {
            x: EMU_PER_INCH / 2,
            y: 274_638,
            cx: 9 * EMU_PER_INCH,
            cy: 1_143_000,
        },
        &slide.title,
        TITLE_SIZE,
        None,
    );

    // Text on the left, picture on the right from 4.5in.
    let body_width = if slide.picture.is_some() {
        7 * EMU_PER_INCH / 2
    } else {
        9 * EMU_PER_INCH
    };
    let body = text_box(
        3,
        "Content",
        &Rect {
            x: EMU_PER_INCH / 2,
            y: 3 * EMU_PER_INCH / 2,
            cx: body_width,
            cy: 5 * EMU_PER_INCH,
        },
        &slide.body,
        TEXT_SIZE,
        None,
    );

    let picture = slide
        .picture
        .as_ref()
        .map(|p| {
            let top = 3 * EMU_PER_INCH / 2;
            let (cx, cy) = p.extent(4 * EMU_PER_INCH, SLIDE_HEIGHT - top - EMU_PER_INCH / 4);
            picture_xml(
                4,
                &Rect {
                    x: 9 * EMU_PER_INCH / 2,
                    y: top,
                    cx,
                    cy,
                },
            )
        })
        .unwrap_or_default();

    slide_xml(&format!("{title}{body}{picture}"))
}

fn slide_xml(shapes: &str) -> String {
    format!(
        r#"{XML_DECL}<p:sld {NS}><p:cSld><p:spTree>{GROUP_HEADER}{shapes}</p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sld>"#
    )
}

fn text_box(id: u32, name: &str, rect: &Rect, text: &str, size: u32, color: Option<&str>) -> String {
    let fill = color
        .map(|c| format!(r#"<a:solidFill><a:srgbClr val="{c}"/></a:solidFill>"#))
        .unwrap_or_default();
    let bold = if size == TITLE_SIZE { r#" b="1""# } else { "" };
    let paragraphs: String = text
        .lines()
        .map(|line| {
            if line.trim().is_empty() {
                format!(r#"<a:p><a:endParaRPr lang="en-US" sz="{size}"/></a:p>"#)
            } else {
                format!(
                    r#"<a:p><a:r><a:rPr lang="en-US" sz="{size}"{bold} dirty="0">{fill}</a:rPr><a:t>{}</a:t></a:r></a:p>"#,
                    escape(line)
                )
            }
        })
        .collect();
    // txBody needs at least one paragraph.
    let paragraphs = if paragraphs.is_empty() {
        "<a:p/>".to_string()
    } else {
        paragraphs
    };
    format!(
        r#"<p:sp><p:nvSpPr><p:cNvPr id="{id}" name="{name}"/><p:cNvSpPr txBox="1"/><p:nvPr/></p:nvSpPr><p:spPr><a:xfrm><a:off x="{}" y="{}"/><a:ext cx="{}" cy="{}"/></a:xfrm><a:prstGeom prst="rect"><a:avLst/></a:prstGeom><a:noFill/></p:spPr><p:txBody><a:bodyPr wrap="square" rtlCol="0"><a:normAutofit/></a:bodyPr><a:lstStyle/>{paragraphs}</p:txBody></p:sp>"#,
        rect.x, rect.y, rect.cx, rect.cy
    )
}

fn picture_xml(id: u32, rect: &Rect) -> String {
    format!(
        r#"<p:pic><p:nvPicPr><p:cNvPr id="{id}" name="Picture {id}"/><p:cNvPicPr><a:picLocks noChangeAspect="1"/></p:cNvPicPr><p:nvPr/></p:nvPicPr><p:blipFill><a:blip r:embed="rId2"/><a:stretch><a:fillRect/></a:stretch></p:blipFill><p:spPr><a:xfrm><a:off x="{}" y="{}"/><a:ext cx="{}" cy="{}"/></a:xfrm><a:prstGeom prst="rect"><a:avLst/></a:prstGeom></p:spPr></p:pic>"#,
        rect.x, rect.y, rect.cx, rect.cy
    )
}

fn slide_rels(layout: u32, image: Option<&str>) -> String {
    let image = image
        .map(|name| {
            format!(r#"<Relationship Id="rId2" Type="{REL_NS}/image" Target="../media/{name}"/>"#)
        })
        .unwrap_or_default();
    format!(
        r#"{XML_DECL}<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="{REL_NS}/slideLayout" Target="../slideLayouts/slideLayout{layout}.xml"/>{image}</Relationships>"#
    )
}

fn slide_master() -> String {
    format!(
        r#"{XML_DECL}<p:sldMaster {NS}><p:cSld><p:bg><p:bgRef idx="1001"><a:schemeClr val="bg1"/></p:bgRef></p:bg><p:spTree>{GROUP_HEADER}</p:spTree></p:cSld><p:clrMap bg1="lt1" tx1="dk1" bg2="lt2" tx2="dk2" accent1="accent1" accent2="accent2" accent3="accent3" accent4="accent4" accent5="accent5" accent6="accent6" hlink="hlink" folHlink="folHlink"/><p:sldLayoutIdLst><p:sldLayoutId id="2147483649" r:id="rId1"/><p:sldLayoutId id="2147483650" r:id="rId2"/></p:sldLayoutIdLst></p:sldMaster>"#
    )
}

fn slide_layout(kind: &str, name: &str) -> String {
    format!(
        r#"{XML_DECL}<p:sldLayout {NS} type="{kind}" preserve="1"><p:cSld name="{name}"><p:spTree>{GROUP_HEADER}</p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sldLayout>"#
    )
}

const GROUP_HEADER: &str = r#"<p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="0" cy="0"/><a:chOff x="0" y="0"/><a:chExt cx="0" cy="0"/></a:xfrm></p:grpSpPr>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="ppt/presentation.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/><Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/extended-properties" Target="docProps/app.xml"/></Relationships>"#;

const MASTER_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout" Target="../slideLayouts/slideLayout1.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout" Target="../slideLayouts/slideLayout2.xml"/><Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/theme" Target="../theme/theme1.xml"/></Relationships>"#;

const LAYOUT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideMaster" Target="../slideMasters/slideMaster1.xml"/></Relationships>"#;

const THEME: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><a:theme xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" name="Study Box"><a:themeElements><a:clrScheme name="Office"><a:dk1><a:sysClr val="windowText" lastClr="000000"/></a:dk1><a:lt1><a:sysClr val="window" lastClr="FFFFFF"/></a:lt1><a:dk2><a:srgbClr val="1F497D"/></a:dk2><a:lt2><a:srgbClr val="EEECE1"/></a:lt2><a:accent1><a:srgbClr val="4F81BD"/></a:accent1><a:accent2><a:srgbClr val="C0504D"/></a:accent2><a:accent3><a:srgbClr val="9BBB59"/></a:accent3><a:accent4><a:srgbClr val="8064A2"/></a:accent4><a:accent5><a:srgbClr val="4BACC6"/></a:accent5><a:accent6><a:srgbClr val="F79646"/></a:accent6><a:hlink><a:srgbClr val="0000FF"/></a:hlink><a:folHlink><a:srgbClr val="800080"/></a:folHlink></a:clrScheme><a:fontScheme name="Office"><a:majorFont><a:latin typeface="Calibri"/><a:ea typeface=""/><a:cs typeface=""/></a:majorFont><a:minorFont><a:latin typeface="Calibri"/><a:ea typeface=""/><a:cs typeface=""/></a:minorFont></a:fontScheme><a:fmtScheme name="Office"><a:fillStyleLst><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:fillStyleLst><a:lnStyleLst><a:ln w="9525"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln><a:ln w="25400"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln><a:ln w="38100"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln></a:lnStyleLst><a:effectStyleLst><a:effectStyle><a:effectLst/></a:effectStyle><a:effectStyle><a:effectLst/></a:effectStyle><a:effectStyle><a:effectLst/></a:effectStyle></a:effectStyleLst><a:bgFillStyleLst><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:bgFillStyleLst></a:fmtScheme></a:themeElements></a:theme>"#;
