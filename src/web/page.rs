//! Upload form served at `/`

use axum::response::Html;

pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

const INDEX_HTML: &str = r#"
<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>BLIP Image Content Analysis</title>
    <style>
        * {
            margin: 0;
            padding: 0;
            box-sizing: border-box;
        }

        body {
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, Oxygen, Ubuntu, Cantarell, sans-serif;
            background: #eef1f7;
            min-height: 100vh;
            padding: 30px 20px;
        }

        .container {
            background: white;
            border-radius: 16px;
            box-shadow: 0 10px 40px rgba(0,0,0,0.12);
            max-width: 1100px;
            margin: 0 auto;
            padding: 36px;
        }

        h1 {
            color: #333;
            margin-bottom: 8px;
            font-size: 1.9em;
        }

        h3 {
            color: #444;
            margin: 30px 0 10px;
        }

        .subtitle {
            color: #666;
            margin-bottom: 28px;
        }

        .columns {
            display: grid;
            grid-template-columns: 1fr 1fr;
            gap: 28px;
        }

        @media (max-width: 800px) {
            .columns { grid-template-columns: 1fr; }
        }

        .label {
            color: #4f5bd5;
            font-weight: 600;
            margin-bottom: 8px;
            font-size: 0.85em;
            text-transform: uppercase;
            letter-spacing: 1px;
        }

        .upload-area {
            border: 3px dashed #4f5bd5;
            border-radius: 12px;
            height: 400px;
            display: flex;
            align-items: center;
            justify-content: center;
            text-align: center;
            cursor: pointer;
            background: #f8f9ff;
            overflow: hidden;
            transition: all 0.3s;
        }

        .upload-area.dragover {
            border-color: #2f3aa8;
            background: #e8ebff;
        }

        .upload-area img {
            max-width: 100%;
            max-height: 100%;
        }

        .upload-hint {
            color: #999;
            font-size: 0.9em;
            margin-top: 8px;
        }

        input[type="file"] {
            display: none;
        }

        button {
            width: 100%;
            margin-top: 16px;
            padding: 14px;
            border: none;
            border-radius: 10px;
            background: #4f5bd5;
            color: white;
            font-size: 1.1em;
            font-weight: 600;
            cursor: pointer;
        }

        button:disabled {
            background: #9aa1e0;
            cursor: wait;
        }

        textarea {
            width: 100%;
            min-height: 140px;
            padding: 12px;
            border: 1px solid #d8dcef;
            border-radius: 10px;
            font-size: 1.05em;
            line-height: 1.5;
            resize: vertical;
            margin-bottom: 20px;
        }

        pre {
            background: #f8f9ff;
            border: 1px solid #d8dcef;
            border-radius: 10px;
            padding: 12px;
            min-height: 200px;
            font-size: 0.85em;
            overflow-x: auto;
        }

        ul {
            margin-left: 20px;
            color: #555;
            line-height: 1.8;
        }
    </style>
</head>
<body>
    <div class="container">
        <h1>BLIP Image Content Analysis</h1>
        <p class="subtitle">Upload an image to get a content description from the BLIP captioning model</p>

        <div class="columns">
            <div>
                <div class="label">Upload Image</div>
                <div class="upload-area" id="uploadArea">
                    <div id="placeholder">
                        <div>Click or drag an image here</div>
                        <div class="upload-hint">JPG, PNG, WebP, GIF, BMP</div>
                    </div>
                </div>
                <input type="file" id="fileInput" accept="image/*">
                <button id="analyzeBtn">Analyze with BLIP</button>
            </div>

            <div>
                <div class="label">BLIP Content Description</div>
                <textarea id="captionText" readonly placeholder="BLIP-generated content description will appear here..."></textarea>
                <div class="label">Analysis Details</div>
                <pre id="analysisOutput">{}</pre>
            </div>
        </div>

        <h3>BLIP Model Features</h3>
        <ul>
            <li><strong>Content-Aware</strong>: describes objects, people, scenes and actions</li>
            <li><strong>Natural Language</strong>: generates human-like descriptions</li>
            <li><strong>Beam Search</strong>: five beams, up to fifty tokens</li>
            <li><strong>Technical Details</strong>: image dimensions, aspect ratio, pixel count and resolution tier</li>
        </ul>
    </div>

    <script>
        const uploadArea = document.getElementById('uploadArea');
        const fileInput = document.getElementById('fileInput');
        const analyzeBtn = document.getElementById('analyzeBtn');
        const captionText = document.getElementById('captionText');
        const analysisOutput = document.getElementById('analysisOutput');
        let currentFile = null;

        uploadArea.addEventListener('click', () => fileInput.click());

        uploadArea.addEventListener('dragover', (e) => {
            e.preventDefault();
            uploadArea.classList.add('dragover');
        });

        uploadArea.addEventListener('dragleave', () => {
            uploadArea.classList.remove('dragover');
        });

        uploadArea.addEventListener('drop', (e) => {
            e.preventDefault();
            uploadArea.classList.remove('dragover');
            const file = e.dataTransfer.files[0];
            if (file && file.type.startsWith('image/')) {
                selectFile(file);
            }
        });

        fileInput.addEventListener('change', (e) => {
            const file = e.target.files[0];
            if (file) {
                selectFile(file);
            }
        });

        analyzeBtn.addEventListener('click', () => analyze());

        function selectFile(file) {
            currentFile = file;
            const reader = new FileReader();
            reader.onload = (e) => {
                uploadArea.innerHTML = '';
                const img = document.createElement('img');
                img.src = e.target.result;
                uploadArea.appendChild(img);
            };
            reader.readAsDataURL(file);
            analyze();
        }

        async function analyze() {
            const formData = new FormData();
            if (currentFile) {
                formData.append('image', currentFile);
            }

            analyzeBtn.disabled = true;
            analyzeBtn.textContent = 'Analyzing...';

            try {
                const response = await fetch('/analyze', {
                    method: 'POST',
                    body: formData
                });
                if (!response.ok) {
                    throw new Error('Request failed with status ' + response.status);
                }
                const result = await response.json();
                captionText.value = result.caption;
                analysisOutput.textContent = JSON.stringify(result.analysis, null, 2);
            } catch (error) {
                captionText.value = 'Error: ' + error.message;
                analysisOutput.textContent = JSON.stringify({ error: error.message }, null, 2);
            } finally {
                analyzeBtn.disabled = false;
                analyzeBtn.textContent = 'Analyze with BLIP';
            }
        }
    </script>
</body>
</html>
"#;
